//! Find usages, macro usages and occurrence marking.

use std::sync::Arc;

use cppmodel::hir::SymbolKind;
use cppmodel::ide::{EditorEvent, Usage, find_references};
use cppmodel::{EditorSession, FilePath, SourceCache};
use tokio_util::sync::CancellationToken;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn usage(file: &str, line: u32, column: u32, length: u32) -> Usage {
    Usage {
        file: FilePath::new(file),
        line,
        column,
        length,
    }
}

fn open_at(cache: Arc<SourceCache>, path: &str, text: &str, cursor: usize) -> EditorSession {
    let mut editor = EditorSession::open(cache, FilePath::new(path), text).unwrap();
    assert!(editor.wait_until_current(TIMEOUT).unwrap());
    editor.move_cursor(cursor).unwrap();
    editor
}

// =============================================================================
// SYMBOL USAGES
// =============================================================================

#[test]
fn test_method_usages_span_header_and_source() {
    let snapshot = snapshot_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let bar = symbol(&snapshot, "/w/foo.h", "bar", SymbolKind::Declaration);

    let usages = find_references(&snapshot, &bar, &CancellationToken::new());

    assert_eq!(
        usages,
        vec![usage("/w/foo.cpp", 3, 11, 3), usage("/w/foo.h", 4, 10, 3)]
    );
}

#[test]
fn test_call_site_is_a_usage() {
    let snapshot = snapshot_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let count = symbol(&snapshot, "/w/foo.h", "count", SymbolKind::Declaration);

    let usages = find_references(&snapshot, &count, &CancellationToken::new());

    assert_eq!(
        usages,
        vec![
            usage("/w/foo.cpp", 7, 13, 5),
            usage("/w/foo.cpp", 10, 10, 5),
            usage("/w/foo.h", 5, 9, 5),
        ]
    );
}

#[test]
fn test_sibling_methods_do_not_share_usages() {
    let snapshot = snapshot_from_sources(&[("/w/tasks.cpp", SIBLING_CLASSES)]);
    let document = document(&snapshot, "/w/tasks.cpp");
    let reader_run = document
        .symbols()
        .symbols()
        .find(|(_, s)| s.name() == Some("run") && s.kind == SymbolKind::Declaration)
        .map(|(id, _)| cppmodel::hir::SymbolRef::new(document.clone(), id))
        .unwrap();

    let usages = find_references(&snapshot, &reader_run, &CancellationToken::new());

    let lines: Vec<u32> = usages.iter().map(|u| u.line).collect();
    assert_eq!(lines, vec![4, 13]);
}

#[test]
fn test_background_usages_match_synchronous() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let editor = open_at(cache, "/w/foo.cpp", FOO_SOURCE, offset_of(FOO_SOURCE, "count(used", 2));

    let now = editor.find_usages_now();
    assert!(editor.find_usages().is_some());
    let background = editor.wait_for_usages(TIMEOUT).unwrap();

    assert_eq!(now, background);
    assert_eq!(now.len(), 3);
    let reported = editor
        .events()
        .try_iter()
        .any(|e| matches!(e, EditorEvent::UsagesFound(u) if u == now));
    assert!(reported);
}

// =============================================================================
// MACRO USAGES
// =============================================================================

#[test]
fn test_find_usages_falls_back_to_macros() {
    let cache = cache_from_sources(&[("/w/macros.h", MACRO_HEADER), ("/w/use.cpp", MACRO_SOURCE)]);
    let editor = open_at(cache, "/w/use.cpp", MACRO_SOURCE, offset_of(MACRO_SOURCE, "FOO", 1));

    let usages = editor.find_usages_now();

    assert_eq!(usages, vec![usage("/w/use.cpp", 3, 13, 3)]);
}

#[test]
fn test_macro_usages_from_definition_line() {
    let cache = cache_from_sources(&[("/w/macros.h", MACRO_HEADER), ("/w/use.cpp", MACRO_SOURCE)]);
    let editor = open_at(cache, "/w/macros.h", MACRO_HEADER, offset_of(MACRO_HEADER, "TWICE", 2));

    assert!(editor.find_usages().is_some());
    let usages = editor.wait_for_usages(TIMEOUT).unwrap();

    assert_eq!(usages, vec![usage("/w/use.cpp", 4, 15, 5)]);
}

// =============================================================================
// OCCURRENCE MARKING
// =============================================================================

#[test]
fn test_mark_symbols_keeps_current_file_only() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor =
        open_at(cache, "/w/foo.cpp", FOO_SOURCE, offset_of(FOO_SOURCE, "count(used", 2));

    assert!(editor.mark_symbols().is_some());
    let marks = editor.wait_for_marks(TIMEOUT).unwrap();

    assert_eq!(
        marks,
        vec![usage("/w/foo.cpp", 7, 13, 5), usage("/w/foo.cpp", 10, 10, 5)]
    );
    assert_eq!(editor.mark_symbols_now(), marks);
    let marked = editor
        .events()
        .try_iter()
        .any(|e| matches!(e, EditorEvent::OccurrencesMarked(m) if m == marks));
    assert!(marked);
}

#[test]
fn test_marks_are_dropped_after_cursor_moves() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor =
        open_at(cache, "/w/foo.cpp", FOO_SOURCE, offset_of(FOO_SOURCE, "count(used", 2));

    assert!(editor.mark_symbols().is_some());
    editor.move_cursor(0).unwrap();

    assert_eq!(editor.wait_for_marks(TIMEOUT), None);
}

#[test]
fn test_nothing_to_mark_on_punctuation() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor = open_at(cache, "/w/foo.cpp", FOO_SOURCE, offset_of(FOO_SOURCE, "{", 0));

    assert_eq!(editor.mark_symbols(), None);
    assert!(editor.mark_symbols_now().is_empty());
}
