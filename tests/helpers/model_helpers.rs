//! Helpers for building caches, snapshots and resolvers from inline sources.

use std::sync::Arc;
use std::time::Duration;

use cppmodel::hir::{Document, Snapshot, SymbolKind, SymbolRef};
use cppmodel::ide::LinkResolver;
use cppmodel::{FilePath, SourceCache};

/// How long tests wait for background work.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A cache holding `files`, checked in order so later files see earlier
/// ones through `#include`.
pub fn cache_from_sources(files: &[(&str, &str)]) -> Arc<SourceCache> {
    let cache = SourceCache::default();
    for (path, text) in files {
        let document = cache.update_source(&FilePath::new(path), text, 1);
        assert!(
            document.diagnostics().iter().all(|d| !d.severity.is_error()),
            "Parse errors in '{}': {:?}",
            path,
            document.diagnostics()
        );
    }
    Arc::new(cache)
}

pub fn snapshot_from_sources(files: &[(&str, &str)]) -> Snapshot {
    cache_from_sources(files).snapshot()
}

pub fn document(snapshot: &Snapshot, path: &str) -> Arc<Document> {
    snapshot
        .document(&FilePath::new(path))
        .cloned()
        .unwrap_or_else(|| panic!("'{path}' should be in the snapshot"))
}

/// Link resolver for `path`, whose editor text is `text`.
pub fn resolver<'a>(snapshot: &Snapshot, path: &str, text: &'a str) -> LinkResolver<'a> {
    LinkResolver::new(document(snapshot, path), snapshot, text)
}

/// Byte offset of the first occurrence of `needle`, plus `shift`.
pub fn offset_of(text: &str, needle: &str, shift: usize) -> usize {
    text.find(needle)
        .unwrap_or_else(|| panic!("'{needle}' not found"))
        + shift
}

/// The first symbol of `kind` named `name` in `path`.
pub fn symbol(snapshot: &Snapshot, path: &str, name: &str, kind: SymbolKind) -> SymbolRef {
    let document = document(snapshot, path);
    let id = document
        .symbols()
        .symbols()
        .find(|(_, s)| s.name() == Some(name) && s.kind == kind)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no {kind:?} named '{name}' in '{path}'"));
    SymbolRef::new(document, id)
}
