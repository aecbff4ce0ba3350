//! Immutable point-in-time map of file path to [`Document`].

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use rustc_hash::{FxHashSet, FxHasher};

use super::document::{Document, SymbolRef};
use super::symbols::SymbolKind;
use crate::base::FilePath;
use crate::parser::{IncludeEnvironment, IncludeKind, Macro, PreprocessedSource, preprocess};

/// Persistent hash map with the Fx hasher; clones share structure.
pub type FxHamt<K, V> = im::HashMap<K, V, BuildHasherDefault<FxHasher>>;

/// The cross-file universe for one lookup.
///
/// A `Snapshot` is a value: [`Snapshot::insert`] returns a new snapshot that
/// shares everything but the replaced entry, so readers holding the old value
/// never see a half-applied update.
#[derive(Clone, Default)]
pub struct Snapshot {
    documents: FxHamt<FilePath, Arc<Document>>,
    include_paths: Arc<[FilePath]>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("documents", &self.documents.len())
            .field("include_paths", &self.include_paths)
            .finish()
    }
}

impl Snapshot {
    pub fn new(include_paths: impl IntoIterator<Item = FilePath>) -> Self {
        Self {
            documents: FxHamt::default(),
            include_paths: include_paths.into_iter().collect(),
        }
    }

    pub fn include_paths(&self) -> &[FilePath] {
        &self.include_paths
    }

    /// A new snapshot with `document` replacing any entry for its path.
    pub fn insert(&self, document: Arc<Document>) -> Snapshot {
        let mut next = self.clone();
        next.insert_mut(document);
        next
    }

    pub fn insert_mut(&mut self, document: Arc<Document>) {
        self.documents.insert(document.path().clone(), document);
    }

    pub fn remove(&self, path: &FilePath) -> Snapshot {
        Snapshot {
            documents: self.documents.without(path),
            include_paths: self.include_paths.clone(),
        }
    }

    pub fn document(&self, path: &FilePath) -> Option<&Arc<Document>> {
        self.documents.get(path)
    }

    pub fn contains(&self, path: &FilePath) -> bool {
        self.documents.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    /// All paths in a stable order.
    pub fn paths(&self) -> Vec<FilePath> {
        let mut paths: Vec<_> = self.documents.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// `first` (when present) followed by every other document in path order.
    pub fn documents_starting_with(&self, first: &FilePath) -> Vec<Arc<Document>> {
        let mut out: Vec<Arc<Document>> = self.document(first).cloned().into_iter().collect();
        out.extend(
            self.paths()
                .into_iter()
                .filter(|p| p != first)
                .filter_map(|p| self.document(&p).cloned()),
        );
        out
    }

    // ------------------------------------------------------------------------
    // Preprocessing against the snapshot
    // ------------------------------------------------------------------------

    /// Candidate locations for an include directive, best first.
    pub fn include_candidates(&self, name: &str, kind: IncludeKind, from: &FilePath) -> Vec<FilePath> {
        let mut candidates = Vec::new();
        if kind == IncludeKind::Quoted {
            if let Some(dir) = from.parent() {
                candidates.push(dir.join(name));
            }
        }
        candidates.extend(self.include_paths.iter().map(|dir| dir.join(name)));
        candidates
    }

    /// Macros visible after including `path`: its includes first, then its own.
    pub fn exported_macros(&self, path: &FilePath) -> Vec<Macro> {
        let mut visited = FxHashSet::default();
        let mut out = Vec::new();
        self.collect_macros(path, &mut visited, &mut out);
        out
    }

    fn collect_macros(&self, path: &FilePath, visited: &mut FxHashSet<FilePath>, out: &mut Vec<Macro>) {
        if !visited.insert(path.clone()) {
            return;
        }
        let Some(document) = self.document(path) else { return };
        for included in document.included_files() {
            self.collect_macros(included, visited, out);
        }
        out.extend(document.defined_macros().iter().cloned());
    }

    /// Expand `raw` as the contents of `path` with the macros its includes
    /// make visible in this snapshot. Deterministic for a given snapshot.
    pub fn preprocessed_code(&self, raw: &str, path: &FilePath, predefined: &[Macro]) -> PreprocessedSource {
        let mut env = SnapshotEnvironment { snapshot: self };
        preprocess(&mut env, raw, path, predefined)
    }

    pub fn document_from_source(&self, source: PreprocessedSource, revision: u32) -> Document {
        Document::from_source(source, revision)
    }

    /// Transitive includes of `path` in depth-first order, `path` excluded.
    pub fn all_includes(&self, path: &FilePath) -> Vec<FilePath> {
        let mut visited = FxHashSet::default();
        visited.insert(path.clone());
        let mut out = Vec::new();
        let mut stack = vec![path.clone()];
        while let Some(current) = stack.pop() {
            let Some(document) = self.document(&current) else { continue };
            let mut next: Vec<FilePath> = document
                .included_files()
                .filter(|p| visited.insert((*p).clone()))
                .cloned()
                .collect();
            out.extend(next.iter().cloned());
            next.reverse();
            stack.extend(next);
        }
        out
    }

    // ------------------------------------------------------------------------
    // Cross-file matching
    // ------------------------------------------------------------------------

    /// The definition of a function declaration: same qualified name and
    /// signature, else the only same-named definition with the same arity.
    pub fn find_matching_definition(&self, declaration: &SymbolRef) -> Option<SymbolRef> {
        let symbol = declaration.symbol();
        if symbol.kind == SymbolKind::Function {
            return Some(declaration.clone());
        }
        let function = symbol.function_type()?;
        let name = symbol.name()?;
        let qualified = declaration.qualified_name();

        let mut same_arity = Vec::new();
        for document in self.documents_starting_with(declaration.file()) {
            if !document.mentions(name) {
                continue;
            }
            for (id, candidate) in document.symbols().symbols() {
                if candidate.kind != SymbolKind::Function || candidate.name() != Some(name) {
                    continue;
                }
                let Some(candidate_type) = candidate.function_type() else { continue };
                if document.qualified_name(id) != qualified {
                    continue;
                }
                let found = SymbolRef::new(document.clone(), id);
                if candidate_type.is_signature_equal(function) {
                    return Some(found);
                }
                if candidate_type.arguments.len() == function.arguments.len() {
                    same_arity.push(found);
                }
            }
        }
        if same_arity.len() == 1 { same_arity.pop() } else { None }
    }

    /// The class a forward declaration names.
    pub fn find_matching_class_declaration(&self, forward: &SymbolRef) -> Option<SymbolRef> {
        let name = forward.name()?;
        let qualified = forward.qualified_name();
        self.documents_starting_with(forward.file())
            .into_iter()
            .find_map(|document| {
                let id = document
                    .symbols()
                    .symbols()
                    .filter(|(_, s)| s.kind == SymbolKind::Class && s.name() == Some(name))
                    .map(|(id, _)| id)
                    .find(|id| document.qualified_name(*id) == qualified)?;
                Some(SymbolRef::new(document, id))
            })
    }
}

/// Resolves includes against the documents already in a snapshot.
pub struct SnapshotEnvironment<'a> {
    pub snapshot: &'a Snapshot,
}

impl IncludeEnvironment for SnapshotEnvironment<'_> {
    fn resolve_include(&mut self, name: &str, kind: IncludeKind, from: &FilePath) -> Option<FilePath> {
        self.snapshot
            .include_candidates(name, kind, from)
            .into_iter()
            .find(|candidate| self.snapshot.contains(candidate))
    }

    fn exported_macros(&mut self, path: &FilePath) -> Vec<Macro> {
        self.snapshot.exported_macros(path)
    }
}
