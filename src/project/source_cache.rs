//! The shared source cache: owner of the current [`Snapshot`].
//!
//! Foreground editors and the background highlighter both read snapshots from
//! here. Writers swap in a new snapshot value under a short write lock; nobody
//! holds the lock while preprocessing or parsing.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use super::config::ModelConfig;
use super::error::{ModelError, Result};
use crate::base::FilePath;
use crate::hir::{Document, Snapshot};
use crate::parser::{IncludeEnvironment, IncludeKind, Macro, preprocess};

pub struct SourceCache {
    config: ModelConfig,
    snapshot: RwLock<Snapshot>,
    /// Files open in an editor; never collected.
    pinned: Mutex<FxHashSet<FilePath>>,
    closed_editors: AtomicUsize,
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

impl SourceCache {
    pub fn new(config: ModelConfig) -> Self {
        let snapshot = Snapshot::new(config.include_paths.iter().cloned());
        Self {
            config,
            snapshot: RwLock::new(snapshot),
            pinned: Mutex::new(FxHashSet::default()),
            closed_editors: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The current snapshot. Cheap: the map is shared structurally.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    pub fn document_for_path(&self, path: &FilePath) -> Option<Arc<Document>> {
        self.snapshot.read().document(path).cloned()
    }

    pub fn contains(&self, path: &FilePath) -> bool {
        self.snapshot.read().contains(path)
    }

    /// Publish `document` unless a newer revision of its file is already in.
    pub fn insert(&self, document: Arc<Document>) -> bool {
        let mut snapshot = self.snapshot.write();
        if let Some(existing) = snapshot.document(document.path()) {
            if existing.revision() > document.revision() {
                trace!(
                    path = %document.path(),
                    existing = existing.revision(),
                    offered = document.revision(),
                    "ignoring older revision"
                );
                return false;
            }
        }
        snapshot.insert_mut(document);
        true
    }

    /// Preprocess and check editor text for `path` against the current
    /// snapshot, then publish the result.
    pub fn update_source(&self, path: &FilePath, text: &str, revision: u32) -> Arc<Document> {
        let snapshot = self.snapshot();
        let source = snapshot.preprocessed_code(text, path, &self.config.predefined_macros);
        let document = Arc::new(snapshot.document_from_source(source, revision));
        self.insert(document.clone());
        document
    }

    /// Read, preprocess and check a file from disk. Included files that are
    /// not in the cache yet are loaded on the way.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Arc<Document>> {
        let path = FilePath::from_path(path.as_ref());
        let mut env = DiskEnvironment {
            cache: self,
            loading: FxHashSet::default(),
        };
        env.load(&path)
    }

    /// Load every C++ file below `dir`. Files that fail to load are skipped
    /// and stay absent from the snapshot.
    pub fn load_directory(&self, dir: impl AsRef<Path>) -> Result<Vec<FilePath>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ModelError::UnknownPath(FilePath::from_path(dir)));
        }
        let mut paths: Vec<FilePath> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| FilePath::from_path(e.path()))
            .filter(|p| self.config.is_cpp_file(p))
            .collect();
        // headers first so sources see their macros without recursion
        paths.sort_by_key(|p| (!self.config.is_header(p), p.clone()));

        let mut loaded = Vec::new();
        for path in paths {
            if self.contains(&path) {
                loaded.push(path);
                continue;
            }
            match self.load_file(path.as_path()) {
                Ok(_) => loaded.push(path),
                Err(e) => warn!("{e}"),
            }
        }
        debug!(dir = %dir.display(), files = loaded.len(), "loaded directory");
        Ok(loaded)
    }

    pub fn remove_file(&self, path: &FilePath) -> bool {
        let mut snapshot = self.snapshot.write();
        if !snapshot.contains(path) {
            return false;
        }
        *snapshot = snapshot.remove(path);
        true
    }

    // ------------------------------------------------------------------------
    // Garbage collection
    // ------------------------------------------------------------------------

    /// An editor opened `path`; keep it and its includes alive.
    pub fn editor_opened(&self, path: &FilePath) {
        self.pinned.lock().insert(path.clone());
    }

    /// An editor closed. Every `gc_threshold` closes the cache is collected.
    pub fn editor_closed(&self, path: &FilePath) {
        self.pinned.lock().remove(path);
        let closed = self.closed_editors.fetch_add(1, Ordering::AcqRel) + 1;
        if closed >= self.config.gc_threshold {
            self.closed_editors.store(0, Ordering::Release);
            self.gc();
        }
    }

    /// Drop every document that is neither pinned nor included, directly or
    /// transitively, by a pinned one. Returns the number removed.
    pub fn gc(&self) -> usize {
        let pinned: Vec<FilePath> = self.pinned.lock().iter().cloned().collect();
        let mut snapshot = self.snapshot.write();
        let mut keep: FxHashSet<FilePath> = FxHashSet::default();
        for path in &pinned {
            keep.insert(path.clone());
            keep.extend(snapshot.all_includes(path));
        }
        let doomed: Vec<FilePath> = snapshot
            .paths()
            .into_iter()
            .filter(|p| !keep.contains(p))
            .collect();
        let mut next = snapshot.clone();
        for path in &doomed {
            next = next.remove(path);
        }
        *snapshot = next;
        debug!(removed = doomed.len(), kept = keep.len(), "source cache gc");
        doomed.len()
    }
}

/// Resolves includes on disk and loads included files into the cache the
/// first time their macros are needed.
struct DiskEnvironment<'a> {
    cache: &'a SourceCache,
    /// Files being preprocessed right now; breaks include cycles.
    loading: FxHashSet<FilePath>,
}

impl DiskEnvironment<'_> {
    fn load(&mut self, path: &FilePath) -> Result<Arc<Document>> {
        let text = std::fs::read_to_string(path.as_path()).map_err(|e| ModelError::io(path, e))?;
        let cache = self.cache;
        self.loading.insert(path.clone());
        let source = preprocess(self, &text, path, &cache.config.predefined_macros);
        self.loading.remove(path);
        let revision = cache.document_for_path(path).map_or(0, |d| d.revision());
        let document = Arc::new(Document::from_source(source, revision));
        trace!(path = %path, "loaded from disk");
        cache.insert(document.clone());
        Ok(document)
    }
}

impl IncludeEnvironment for DiskEnvironment<'_> {
    fn resolve_include(&mut self, name: &str, kind: IncludeKind, from: &FilePath) -> Option<FilePath> {
        let snapshot = self.cache.snapshot();
        snapshot
            .include_candidates(name, kind, from)
            .into_iter()
            .find(|candidate| snapshot.contains(candidate) || candidate.as_path().is_file())
    }

    fn exported_macros(&mut self, path: &FilePath) -> Vec<Macro> {
        if !self.cache.contains(path) && !self.loading.contains(path) {
            if let Err(e) = self.load(path) {
                debug!("include not loaded: {e}");
            }
        }
        self.cache.snapshot().exported_macros(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> FilePath {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        FilePath::from_path(&path)
    }

    #[test]
    fn test_load_file_pulls_in_includes() {
        let dir = tempfile::tempdir().unwrap();
        let header = write(dir.path(), "a.h", "#define FOO 1\n");
        let source = write(dir.path(), "b.cpp", "#include \"a.h\"\nint x = FOO;\n");
        let cache = SourceCache::default();
        let document = cache.load_file(source.as_path()).unwrap();
        assert!(cache.contains(&header));
        assert_eq!(document.macro_uses().len(), 1);
        assert_eq!(document.macro_uses()[0].definition_file, header);
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceCache::default();
        let missing = dir.path().join("nope.cpp");
        assert!(matches!(cache.load_file(&missing), Err(ModelError::Io { .. })));
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn test_include_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.h", "#include \"b.h\"\n#define A 1\n");
        write(dir.path(), "b.h", "#include \"a.h\"\n#define B 2\n");
        let cache = SourceCache::default();
        let loaded = cache.load_directory(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_older_revision_does_not_replace_newer() {
        let cache = SourceCache::default();
        let path = FilePath::new("/mem/a.cpp");
        cache.update_source(&path, "int newer;\n", 5);
        assert!(!cache.insert(Arc::new(Document::from_source(
            crate::parser::PreprocessedSource::unprocessed(path.clone(), "int older;\n"),
            3,
        ))));
        assert_eq!(cache.document_for_path(&path).unwrap().revision(), 5);
    }

    #[test]
    fn test_gc_keeps_pinned_files_and_their_includes() {
        let dir = tempfile::tempdir().unwrap();
        let header = write(dir.path(), "shared.h", "int shared;\n");
        let open = write(dir.path(), "open.cpp", "#include \"shared.h\"\n");
        let closed = write(dir.path(), "closed.cpp", "int other;\n");
        let config = ModelConfig {
            gc_threshold: 2,
            ..ModelConfig::default()
        };
        let cache = SourceCache::new(config);
        cache.load_directory(dir.path()).unwrap();
        cache.editor_opened(&open);
        cache.editor_opened(&closed);
        cache.editor_closed(&closed);
        assert_eq!(cache.snapshot().len(), 3);
        cache.editor_closed(&FilePath::new("/elsewhere.cpp"));
        let snapshot = cache.snapshot();
        assert!(snapshot.contains(&open));
        assert!(snapshot.contains(&header));
        assert!(!snapshot.contains(&closed));
    }
}
