//! Editor session lifecycle: revisions, result application and navigation.

use std::sync::Arc;

use cppmodel::ide::{EditorEvent, Key};
use cppmodel::{EditorSession, FilePath, SourceCache};

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn open(cache: Arc<SourceCache>, path: &str, text: &str) -> EditorSession {
    let mut editor = EditorSession::open(cache, FilePath::new(path), text).unwrap();
    assert!(editor.wait_until_current(TIMEOUT).unwrap());
    editor
}

#[test]
fn test_revision_never_decreases() {
    let mut editor = open(cache_from_sources(&[]), "/w/a.cpp", "int a;\n");
    let mut seen = vec![editor.revision()];

    editor.edit(0..0, "// top\n").unwrap();
    seen.push(editor.revision());
    editor.move_cursor(editor.text().len()).unwrap();
    editor.key_press(Key::Char('x')).unwrap();
    seen.push(editor.revision());
    editor.undo().unwrap();
    seen.push(editor.revision());
    editor.redo().unwrap();
    seen.push(editor.revision());

    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert_eq!(editor.text(), "// top\nint a;\nx");
}

#[test]
fn test_applied_result_matches_live_revision() {
    let mut editor = open(cache_from_sources(&[]), "/w/a.cpp", "int a;\n");
    for i in 0..20 {
        let end = editor.text().len();
        editor.edit(end..end, &format!("int v{i};\n")).unwrap();
    }

    assert!(editor.wait_until_current(TIMEOUT).unwrap());

    assert_eq!(editor.semantic_info().revision, editor.revision());
    let document = editor.semantic_info().document.clone().unwrap();
    assert_eq!(document.revision(), editor.revision());
    assert!(document.mentions("v19"));
}

#[test]
fn test_applied_document_is_published_to_cache() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER)]);
    let mut editor = open(cache.clone(), "/w/foo.cpp", FOO_SOURCE);
    editor.edit(0..0, "\n").unwrap();
    assert!(editor.wait_until_current(TIMEOUT).unwrap());

    let published = cache.document_for_path(&FilePath::new("/w/foo.cpp")).unwrap();
    assert_eq!(published.revision(), editor.revision());
}

#[test]
fn test_events_follow_an_applied_result() {
    let editor = open(cache_from_sources(&[]), "/w/a.cpp", "void f()\n{\n    int x = 1;\n}\n");

    let events: Vec<EditorEvent> = editor.events().try_iter().collect();

    assert!(matches!(
        events.as_slice(),
        [EditorEvent::SemanticInfoUpdated(_), EditorEvent::UsesFound(_), ..]
    ));
}

#[test]
fn test_poll_applies_results_for_moved_cursor() {
    let text = "void f()\n{\n    int x = 1;\n    x += 1;\n}\n";
    let mut editor = open(cache_from_sources(&[]), "/w/a.cpp", text);
    editor.events().try_iter().for_each(drop);
    editor.move_cursor(offset_of(text, "x += 1", 0)).unwrap();

    let deadline = std::time::Instant::now() + TIMEOUT;
    let mut uses = None;
    while uses.is_none() && std::time::Instant::now() < deadline {
        editor.poll().unwrap();
        uses = editor.events().try_iter().find_map(|e| match e {
            EditorEvent::UsesFound(found) if !found.is_empty() => Some(found),
            _ => None,
        });
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    let uses = uses.expect("local uses should be reported");
    assert_eq!(uses.len(), 1);
    assert_eq!(uses[0].0.name, "x");
    assert_eq!(uses[0].1.len(), 2);
    assert_eq!(editor.rename_session().selections().len(), 2);
}

#[test]
fn test_switch_declaration_definition_from_editor() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor = open(cache, "/w/foo.cpp", FOO_SOURCE);
    editor.move_cursor(offset_of(FOO_SOURCE, "int unused", 0)).unwrap();

    let link = editor.switch_declaration_definition();

    assert_eq!(link.file, Some(FilePath::new("/w/foo.h")));
    assert_eq!((link.line, link.column), (4, 9));
    let resolved = editor
        .events()
        .try_iter()
        .any(|e| matches!(e, EditorEvent::LinkResolved(l) if l == link));
    assert!(resolved);
}

#[test]
fn test_find_link_uses_live_text() {
    let cache = cache_from_sources(&[("/w/foo.h", FOO_HEADER), ("/w/foo.cpp", FOO_SOURCE)]);
    let mut editor = open(cache, "/w/foo.cpp", FOO_SOURCE);
    editor.edit(0..0, "\n\n").unwrap();

    let offset = offset_of(editor.text(), "count(used", 1);
    let link = editor.find_link_at(offset, true);

    assert_eq!(link.file, Some(FilePath::new("/w/foo.cpp")));
    assert_eq!(link.line, 12);
    assert_eq!(&editor.text()[link.begin..link.end], "count");
}

#[test]
fn test_closed_editor_stops_its_worker() {
    let cache = cache_from_sources(&[]);
    let editor = open(cache.clone(), "/w/a.cpp", "int a;\n");
    assert!(editor.highlighter().is_running());
    drop(editor);

    assert!(cache.contains(&FilePath::new("/w/a.cpp")));
    assert_eq!(cache.gc(), 1);
    assert!(!cache.contains(&FilePath::new("/w/a.cpp")));
}
