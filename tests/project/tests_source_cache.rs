//! Loading projects from disk and working on them.

use std::path::Path;
use std::sync::Arc;

use cppmodel::ide::LinkResolver;
use cppmodel::{EditorSession, FilePath, ModelConfig, ModelError, SourceCache};
use tempfile::TempDir;

use crate::helpers::model_helpers::*;
use crate::helpers::source_fixtures::*;

fn write(dir: &Path, name: &str, text: &str) -> FilePath {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, text).unwrap();
    FilePath::from_path(&path)
}

/// `include/foo.h`, `src/foo.cpp` and a non-C++ file.
fn project() -> (TempDir, FilePath, FilePath) {
    let dir = tempfile::tempdir().unwrap();
    let header = write(dir.path(), "include/foo.h", FOO_HEADER);
    let source = write(dir.path(), "src/foo.cpp", FOO_SOURCE);
    write(dir.path(), "README.md", "# not C++\n");
    (dir, header, source)
}

fn cache_for(dir: &TempDir) -> Arc<SourceCache> {
    let include = FilePath::from_path(&dir.path().join("include"));
    Arc::new(SourceCache::new(ModelConfig::default().with_include_path(include)))
}

#[test]
fn test_load_directory_picks_up_cpp_files_only() {
    let (dir, header, source) = project();
    let cache = cache_for(&dir);

    let mut loaded = cache.load_directory(dir.path()).unwrap();
    loaded.sort();

    assert_eq!(loaded, vec![header.clone(), source.clone()]);
    assert_eq!(cache.snapshot().len(), 2);
    let document = cache.document_for_path(&source).unwrap();
    assert_eq!(document.included_files().collect::<Vec<_>>(), vec![&header]);
}

#[test]
fn test_load_directory_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SourceCache::default();

    let result = cache.load_directory(dir.path().join("missing"));

    assert!(matches!(result, Err(ModelError::UnknownPath(_))));
}

#[test]
fn test_links_cross_files_loaded_from_disk() {
    let (dir, header, source) = project();
    let cache = cache_for(&dir);
    cache.load_directory(dir.path()).unwrap();
    let snapshot = cache.snapshot();
    let document = snapshot.document(&source).unwrap().clone();

    let resolver = LinkResolver::new(document, &snapshot, FOO_SOURCE);
    let link = resolver.switch_declaration_definition(offset_of(FOO_SOURCE, "int unused", 0));

    assert_eq!(link.file, Some(header));
    assert_eq!((link.line, link.column), (4, 9));
}

#[test]
fn test_editor_on_loaded_file_replaces_its_document() {
    let (dir, _header, source) = project();
    let cache = cache_for(&dir);
    cache.load_directory(dir.path()).unwrap();
    let loaded_revision = cache.document_for_path(&source).unwrap().revision();

    let mut editor = EditorSession::open(cache.clone(), source.clone(), FOO_SOURCE).unwrap();
    editor.edit(0..0, "// edited\n").unwrap();
    assert!(editor.wait_until_current(TIMEOUT).unwrap());

    let published = cache.document_for_path(&source).unwrap();
    assert!(published.revision() > loaded_revision);
    assert!(published.mentions("used"));
}

#[test]
fn test_removed_file_leaves_snapshot() {
    let (dir, header, source) = project();
    let cache = cache_for(&dir);
    cache.load_directory(dir.path()).unwrap();
    let before = cache.snapshot();

    assert!(cache.remove_file(&header));
    assert!(!cache.remove_file(&header));

    assert!(before.contains(&header));
    assert!(!cache.contains(&header));
    assert!(cache.contains(&source));
}
