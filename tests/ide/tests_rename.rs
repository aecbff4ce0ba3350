//! Renaming through an editor session.

use cppmodel::hir::{SymbolKind, SymbolRef};
use cppmodel::ide::{FileEdits, Key, TextEdit};
use cppmodel::{EditorSession, FilePath};
use rstest::rstest;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

const LOCAL_VALUE: &str = "\
int main()
{
    int value = 1;
    value += value;
    return value;
}
";

fn open_at(
    cache: std::sync::Arc<cppmodel::SourceCache>,
    path: &str,
    text: &str,
    cursor: usize,
) -> EditorSession {
    let mut editor = EditorSession::open(cache, FilePath::new(path), text).unwrap();
    assert!(editor.wait_until_current(TIMEOUT).unwrap());
    editor.move_cursor(cursor).unwrap();
    editor
}

// =============================================================================
// RENAME USAGES
// =============================================================================

#[test]
fn test_rename_edits_buffer_and_returns_other_files() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor =
        open_at(cache, "/w/foo.cpp", FOO_SOURCE, offset_of(FOO_SOURCE, "count(used", 2));
    let before = editor.revision();

    let others = editor.rename_usages_now("tally").unwrap();

    assert_eq!(editor.text(), FOO_SOURCE.replace("count", "tally"));
    assert_eq!(
        others,
        vec![FileEdits {
            file: FilePath::new("/w/foo.h"),
            edits: vec![TextEdit {
                line: 5,
                column: 9,
                length: 5,
                replacement: "tally".to_string(),
            }],
        }]
    );
    assert!(editor.revision() > before);

    editor.undo().unwrap();
    assert_eq!(editor.text(), FOO_SOURCE);
    assert!(!editor.buffer().can_undo());
}

#[rstest]
#[case("enum { Red };\nint shade = Red;\n", "enum")]
#[case("int a;\nint b = a + 1;\n", "+")]
fn test_rename_without_symbol_is_noop(#[case] text: &str, #[case] at: &str) {
    let cache = cache_from_sources(&[]);
    let mut editor = open_at(cache, "/w/anon.cpp", text, offset_of(text, at, 1));
    let revision = editor.revision();

    let others = editor.rename_usages_now("renamed").unwrap();

    assert!(others.is_empty());
    assert_eq!(editor.text(), text);
    assert_eq!(editor.revision(), revision);
    assert!(!editor.buffer().can_undo());
}

#[test]
fn test_rename_of_anonymous_symbol_changes_nothing() {
    let text = "enum { Red, Green };\nint shade = Red;\n";
    let cache = cache_from_sources(&[]);
    let mut editor = open_at(cache, "/w/anon.cpp", text, offset_of(text, "Red;", 1));
    let info = editor.semantic_info().clone();
    let document = info.document.clone().unwrap();
    let anonymous = document
        .symbols()
        .symbols()
        .find(|(_, s)| s.kind == SymbolKind::Enum && s.name().is_none())
        .map(|(id, _)| SymbolRef::new(document.clone(), id))
        .unwrap();
    let revision = editor.revision();

    let others = editor.rename_symbol(&info, &anonymous, "Palette").unwrap();

    assert!(others.is_empty());
    assert_eq!(editor.text(), text);
    assert_eq!(editor.revision(), revision);
    assert!(!editor.buffer().can_undo());
}

// =============================================================================
// IN-PLACE RENAME
// =============================================================================

#[test]
fn test_in_place_rename_mirrors_typing() {
    let cache = cache_from_sources(&[]);
    let end_of_value = offset_of(LOCAL_VALUE, "value", 5);
    let mut editor = open_at(cache, "/w/main.cpp", LOCAL_VALUE, end_of_value);

    assert!(editor.rename_symbol_under_cursor());
    assert_eq!(editor.rename_session().selections().len(), 4);
    editor.key_press(Key::Char('s')).unwrap();
    editor.key_press(Key::Char('s')).unwrap();
    editor.key_press(Key::Backspace).unwrap();

    assert_eq!(editor.text(), LOCAL_VALUE.replace("value", "values"));
    assert!(editor.rename_session().is_active());

    editor.undo().unwrap();
    assert_eq!(editor.text(), LOCAL_VALUE);
    assert!(!editor.rename_session().is_active());
    assert!(!editor.buffer().can_undo());
}

#[test]
fn test_escape_ends_in_place_rename() {
    let cache = cache_from_sources(&[]);
    let mut editor = open_at(cache, "/w/main.cpp", LOCAL_VALUE, offset_of(LOCAL_VALUE, "value", 2));

    assert!(editor.rename_symbol_under_cursor());
    assert_eq!(editor.key_press(Key::Escape).unwrap(), None);
    assert!(!editor.rename_session().is_active());

    editor.key_press(Key::Char('x')).unwrap();
    assert_eq!(editor.text().matches("value").count(), 3);
    assert!(editor.text().contains("vaxlue"));
}

#[test]
fn test_in_place_rename_of_member_stays_in_file() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor =
        open_at(cache, "/w/foo.cpp", FOO_SOURCE, offset_of(FOO_SOURCE, "count(used", 5));

    assert!(editor.rename_symbol_under_cursor());
    editor.key_press(Key::Char('2')).unwrap();

    assert_eq!(editor.text(), FOO_SOURCE.replace("count", "count2"));
}
