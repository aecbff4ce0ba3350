//! The request and result types of the semantic highlighter.

use std::fmt;
use std::sync::Arc;

use crate::base::FilePath;
use crate::hir::{Document, LocalUseMap, Snapshot, Use, is_unused};
use crate::parser::DiagnosticMessage;

/// What the editor asks the highlighter to analyse.
#[derive(Clone)]
pub struct SemanticInfoSource {
    pub path: FilePath,
    pub text: Arc<str>,
    pub revision: u32,
    /// 1-based cursor line.
    pub line: u32,
    /// 1-based cursor column.
    pub column: u32,
    /// Reparse even if the revision did not change.
    pub force: bool,
    /// The cross-file universe at request time.
    pub snapshot: Snapshot,
}

impl SemanticInfoSource {
    pub fn new(path: FilePath, text: impl Into<Arc<str>>, revision: u32, snapshot: Snapshot) -> Self {
        Self {
            path,
            text: text.into(),
            revision,
            line: 1,
            column: 1,
            force: false,
            snapshot,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

impl fmt::Debug for SemanticInfoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticInfoSource")
            .field("path", &self.path)
            .field("revision", &self.revision)
            .field("line", &self.line)
            .field("column", &self.column)
            .field("force", &self.force)
            .finish()
    }
}

/// Everything the highlighter publishes for one revision of one file.
#[derive(Clone)]
pub struct SemanticInfo {
    pub revision: u32,
    pub path: FilePath,
    /// Snapshot the document was checked against, with the document in it.
    pub snapshot: Snapshot,
    pub document: Option<Arc<Document>>,
    /// Uses inside the function under the cursor, grouped by declaration.
    pub local_uses: LocalUseMap,
    pub has_q: bool,
    pub has_d: bool,
    pub forced: bool,
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl SemanticInfo {
    /// The state before anything was computed.
    pub fn empty(path: FilePath) -> Self {
        Self {
            revision: 0,
            path,
            snapshot: Snapshot::default(),
            document: None,
            local_uses: LocalUseMap::default(),
            has_q: false,
            has_d: false,
            forced: false,
            diagnostics: Vec::new(),
        }
    }

    /// Uses of declarations that are never referenced again.
    pub fn unused_uses(&self) -> impl Iterator<Item = &Use> {
        self.local_uses
            .iter()
            .filter(|(key, uses)| is_unused(key, uses))
            .flat_map(|(_, uses)| uses.iter())
    }
}

/// Equal when the published analysis is the same; the snapshot and the
/// `forced` flag are bookkeeping and do not take part.
impl PartialEq for SemanticInfo {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision
            && self.path == other.path
            && self.document.is_some() == other.document.is_some()
            && self.local_uses == other.local_uses
            && self.has_q == other.has_q
            && self.has_d == other.has_d
            && self.diagnostics == other.diagnostics
    }
}

impl Eq for SemanticInfo {}

impl fmt::Debug for SemanticInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticInfo")
            .field("revision", &self.revision)
            .field("path", &self.path)
            .field("document", &self.document.is_some())
            .field("local_uses", &self.local_uses.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}
