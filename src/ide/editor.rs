//! One open editor: the foreground side of the semantic model.
//!
//! An [`EditorSession`] owns the text buffer, the cursor, the background
//! highlighter for its file and the rename state. It submits highlight
//! requests after edits and cursor moves, applies published results only
//! when they match the live revision, and reports everything it learns as
//! [`EditorEvent`]s on a channel.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::canonical::{canonical_macro, canonical_symbol};
use super::highlighter::SemanticHighlighter;
use super::link::{Link, LinkResolver};
use super::references::{Usage, find_macro_usages, find_references};
use super::rename::RenameSession;
use super::semantic_info::{SemanticInfo, SemanticInfoSource};
use super::text_buffer::{Change, Key, TextBuffer};
use super::usages::UsageSearch;
use crate::base::text_utils::end_of_identifier;
use crate::base::{FilePath, Position};
use crate::hir::{LookupContext, SymbolKey, SymbolRef, Use};
use crate::project::{Result, SourceCache};

/// Notifications for whoever draws the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A result for the live revision was applied.
    SemanticInfoUpdated(SemanticInfo),
    /// Local uses of the function under the cursor, per declaring symbol.
    UsesFound(Vec<(SymbolKey, Vec<Use>)>),
    /// Occurrences in this file of the symbol under the cursor.
    OccurrencesMarked(Vec<Usage>),
    LinkResolved(Link),
    UsagesFound(Vec<Usage>),
}

/// A replacement of `length` bytes at a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub replacement: String,
}

/// Edits for one file other than the editor's own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdits {
    pub file: FilePath,
    pub edits: Vec<TextEdit>,
}

/// What a pending occurrence search was started for.
#[derive(Debug, Clone, Copy)]
struct MarkRequest {
    sequence: u64,
    cursor: usize,
    revision: u32,
}

pub struct EditorSession {
    path: FilePath,
    cache: Arc<SourceCache>,
    buffer: TextBuffer,
    cursor: usize,
    highlighter: SemanticHighlighter,
    last_semantic_info: SemanticInfo,
    rename: RenameSession,
    mark_search: UsageSearch,
    mark_request: Option<MarkRequest>,
    usage_search: UsageSearch,
    events: Sender<EditorEvent>,
    receiver: Receiver<EditorEvent>,
}

impl EditorSession {
    /// Open `path` with `text` and request its first highlight.
    pub fn open(cache: Arc<SourceCache>, path: FilePath, text: impl Into<String>) -> Result<Self> {
        let highlighter = SemanticHighlighter::start(cache.clone())?;
        cache.editor_opened(&path);
        let (events, receiver) = unbounded();
        let session = Self {
            last_semantic_info: SemanticInfo::empty(path.clone()),
            path,
            cache,
            buffer: TextBuffer::new(text),
            cursor: 0,
            highlighter,
            rename: RenameSession::new(),
            mark_search: UsageSearch::new(),
            mark_request: None,
            usage_search: UsageSearch::new(),
            events,
            receiver,
        };
        debug!(path = %session.path, "editor opened");
        session.rehighlight(false)?;
        Ok(session)
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn revision(&self) -> u32 {
        self.buffer.revision()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_position(&self) -> Position {
        self.buffer.position(self.cursor)
    }

    /// The last applied result.
    pub fn semantic_info(&self) -> &SemanticInfo {
        &self.last_semantic_info
    }

    pub fn rename_session(&self) -> &RenameSession {
        &self.rename
    }

    pub fn highlighter(&self) -> &SemanticHighlighter {
        &self.highlighter
    }

    pub fn events(&self) -> &Receiver<EditorEvent> {
        &self.receiver
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    pub fn edit(&mut self, range: Range<usize>, text: &str) -> Result<Change> {
        let change = self.buffer.replace(range, text);
        self.after_change(change)?;
        Ok(change)
    }

    pub fn move_cursor(&mut self, offset: usize) -> Result<()> {
        self.cursor = offset.min(self.buffer.len());
        self.rehighlight(false)
    }

    /// A keystroke at the cursor, routed through any active rename.
    pub fn key_press(&mut self, key: Key) -> Result<Option<Change>> {
        let change = self.rename.handle_key(&mut self.buffer, &mut self.cursor, key);
        if change.is_some() {
            self.rehighlight(false)?;
        }
        Ok(change)
    }

    pub fn undo(&mut self) -> Result<()> {
        let changes = self.buffer.undo();
        if changes.is_empty() {
            return Ok(());
        }
        self.rename.abort();
        self.cursor = self.cursor.min(self.buffer.len());
        self.rehighlight(false)
    }

    pub fn redo(&mut self) -> Result<()> {
        let changes = self.buffer.redo();
        if changes.is_empty() {
            return Ok(());
        }
        self.rename.abort();
        self.cursor = self.cursor.min(self.buffer.len());
        self.rehighlight(false)
    }

    fn after_change(&mut self, change: Change) -> Result<()> {
        self.rename.on_contents_changed(change);
        if self.cursor >= change.position + change.removed {
            self.cursor = self.cursor + change.added - change.removed;
        } else if self.cursor > change.position {
            self.cursor = change.position + change.added;
        }
        self.rehighlight(false)
    }

    /// Ask the worker for a fresh result for the live text and cursor.
    pub fn rehighlight(&self, force: bool) -> Result<()> {
        let position = self.cursor_position();
        let source = SemanticInfoSource::new(
            self.path.clone(),
            self.buffer.text(),
            self.buffer.revision(),
            self.cache.snapshot(),
        )
        .at(position.line, position.column)
        .forced(force);
        self.highlighter.rehighlight(source)
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    /// Apply everything the background workers have delivered. Returns the
    /// number of events emitted.
    pub fn poll(&mut self) -> Result<usize> {
        let mut emitted = 0;
        while let Ok(info) = self.highlighter.results().try_recv() {
            if self.update_semantic_info(info)? {
                emitted += 1;
            }
        }
        while let Ok(result) = self.mark_search.results().try_recv() {
            if self.accept_marks(result.sequence, result.usages) {
                emitted += 1;
            }
        }
        while let Ok(result) = self.usage_search.results().try_recv() {
            if self.usage_search.is_current(&result) {
                self.emit(EditorEvent::UsagesFound(result.usages));
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Block until a result for the live revision has been applied.
    pub fn wait_until_current(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        while self.last_semantic_info.revision != self.buffer.revision()
            || self.last_semantic_info.document.is_none()
        {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Ok(false);
            };
            let Ok(info) = self.highlighter.results().recv_timeout(remaining) else {
                return Ok(false);
            };
            self.update_semantic_info(info)?;
        }
        Ok(true)
    }

    /// Apply a published result. Results for an older revision than the
    /// buffer's are dropped and a fresh highlight is requested instead.
    pub fn update_semantic_info(&mut self, info: SemanticInfo) -> Result<bool> {
        if info.revision < self.last_semantic_info.revision {
            trace!(revision = info.revision, "dropped out-of-order result");
            return Ok(false);
        }
        if info.revision != self.buffer.revision() {
            trace!(
                revision = info.revision,
                live = self.buffer.revision(),
                "stale result, rehighlighting"
            );
            self.rehighlight(false)?;
            return Ok(false);
        }

        if let Some(document) = &info.document {
            self.cache.insert(document.clone());
        }
        self.last_semantic_info = info.clone();
        self.emit(EditorEvent::SemanticInfoUpdated(info.clone()));
        let uses = info
            .local_uses
            .iter()
            .map(|(key, uses)| (key.clone(), uses.clone()))
            .collect();
        self.emit(EditorEvent::UsesFound(uses));

        if !self.rename.is_active() {
            let ranges = self.local_use_ranges_at_cursor(&info);
            if ranges.is_empty() {
                self.rename.set_selections(Vec::new());
                self.mark_symbols();
            } else {
                self.rename.set_selections(ranges);
            }
        }
        Ok(true)
    }

    fn emit(&self, event: EditorEvent) {
        // the session owns the receiver, so sending cannot fail
        let _ = self.events.send(event);
    }

    /// Byte ranges of the local uses of the symbol under the cursor.
    fn local_use_ranges_at_cursor(&self, info: &SemanticInfo) -> Vec<Range<usize>> {
        let position = self.cursor_position();
        let text = self.buffer.text();
        info.local_uses
            .values()
            .find(|uses| {
                uses.iter().any(|u| {
                    u.line == position.line
                        && position.column >= u.column
                        && position.column <= u.column + u.length
                })
            })
            .map(|uses| {
                uses.iter()
                    .filter_map(|u| self.buffer.offset(Position::new(u.line, u.column)))
                    .map(|start| start..end_of_identifier(text, start))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The last result if it matches the live text, otherwise one computed
    /// on this thread.
    fn current_semantic_info(&self) -> SemanticInfo {
        if self.last_semantic_info.revision == self.buffer.revision()
            && self.last_semantic_info.document.is_some()
        {
            return self.last_semantic_info.clone();
        }
        let position = self.cursor_position();
        let source = SemanticInfoSource::new(
            self.path.clone(),
            self.buffer.text(),
            self.buffer.revision(),
            self.cache.snapshot(),
        )
        .at(position.line, position.column);
        self.highlighter.semantic_info(&source)
    }

    fn canonical_symbol_at_cursor(&self, info: &SemanticInfo) -> Option<SymbolRef> {
        let document = info.document.clone()?;
        let context = LookupContext::new(document, &info.snapshot);
        canonical_symbol(&context, self.buffer.text(), self.cursor)
    }

    // ------------------------------------------------------------------------
    // Occurrence marking
    // ------------------------------------------------------------------------

    /// Start a background search for the occurrences of the symbol under the
    /// cursor. The result is shown only if nothing moved in the meantime.
    pub fn mark_symbols(&mut self) -> Option<u64> {
        let info = self.last_semantic_info.clone();
        let Some(symbol) = self.canonical_symbol_at_cursor(&info) else {
            self.mark_search.cancel();
            self.mark_request = None;
            return None;
        };
        let snapshot = info.snapshot.clone();
        let sequence = self
            .mark_search
            .start(move |token| find_references(&snapshot, &symbol, token));
        self.mark_request = Some(MarkRequest {
            sequence,
            cursor: self.cursor,
            revision: info.revision,
        });
        Some(sequence)
    }

    /// Occurrences of the symbol under the cursor in this file, computed on
    /// this thread.
    pub fn mark_symbols_now(&self) -> Vec<Usage> {
        let info = self.current_semantic_info();
        let Some(symbol) = self.canonical_symbol_at_cursor(&info) else {
            return Vec::new();
        };
        let mut usages = find_references(&info.snapshot, &symbol, &CancellationToken::new());
        usages.retain(|u| u.file == self.path);
        usages
    }

    /// Wait for the pending occurrence search and apply it.
    pub fn wait_for_marks(&mut self, timeout: Duration) -> Option<Vec<Usage>> {
        let result = self.mark_search.wait_timeout(timeout)?;
        let usages = result.usages.clone();
        self.accept_marks(result.sequence, result.usages)
            .then(|| usages.into_iter().filter(|u| u.file == self.path).collect())
    }

    fn accept_marks(&mut self, sequence: u64, mut usages: Vec<Usage>) -> bool {
        let Some(request) = self.mark_request else {
            return false;
        };
        if sequence != self.mark_search.latest()
            || request.sequence != sequence
            || request.cursor != self.cursor
            || request.revision != self.buffer.revision()
        {
            trace!(sequence, "dropped outdated occurrences");
            return false;
        }
        self.mark_request = None;
        usages.retain(|u| u.file == self.path);
        self.emit(EditorEvent::OccurrencesMarked(usages));
        true
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn find_link_at(&self, offset: usize, resolve_target: bool) -> Link {
        let info = self.current_semantic_info();
        let link = LinkResolver::for_semantic_info(&info, self.buffer.text())
            .map(|resolver| resolver.find_link_at(offset, resolve_target))
            .unwrap_or_default();
        self.emit(EditorEvent::LinkResolved(link.clone()));
        link
    }

    pub fn switch_declaration_definition(&self) -> Link {
        let info = self.current_semantic_info();
        let link = LinkResolver::for_semantic_info(&info, self.buffer.text())
            .map(|resolver| resolver.switch_declaration_definition(self.cursor))
            .unwrap_or_default();
        self.emit(EditorEvent::LinkResolved(link.clone()));
        link
    }

    // ------------------------------------------------------------------------
    // Usages and rename
    // ------------------------------------------------------------------------

    /// Search all usages of the symbol or macro under the cursor in the
    /// background; the result arrives as [`EditorEvent::UsagesFound`].
    pub fn find_usages(&self) -> Option<u64> {
        let info = self.current_semantic_info();
        let snapshot = info.snapshot.clone();
        if let Some(symbol) = self.canonical_symbol_at_cursor(&info) {
            return Some(
                self.usage_search
                    .start(move |token| find_references(&snapshot, &symbol, token)),
            );
        }
        let document = info.document.as_ref()?;
        let definition = canonical_macro(document, &snapshot, self.buffer.text(), self.cursor)?;
        Some(
            self.usage_search
                .start(move |token| find_macro_usages(&snapshot, &definition, token)),
        )
    }

    /// Wait for the latest usage search and report it.
    pub fn wait_for_usages(&self, timeout: Duration) -> Option<Vec<Usage>> {
        let result = self.usage_search.wait_timeout(timeout)?;
        self.emit(EditorEvent::UsagesFound(result.usages.clone()));
        Some(result.usages)
    }

    pub fn find_usages_now(&self) -> Vec<Usage> {
        let info = self.current_semantic_info();
        let token = CancellationToken::new();
        if let Some(symbol) = self.canonical_symbol_at_cursor(&info) {
            return find_references(&info.snapshot, &symbol, &token);
        }
        info.document
            .as_ref()
            .and_then(|d| canonical_macro(d, &info.snapshot, self.buffer.text(), self.cursor))
            .map(|definition| find_macro_usages(&info.snapshot, &definition, &token))
            .unwrap_or_default()
    }

    /// Start an in-place rename of the occurrence under the cursor: local
    /// uses if the cursor is on one, otherwise every reference in this file.
    pub fn rename_symbol_under_cursor(&mut self) -> bool {
        let info = self.current_semantic_info();
        let mut ranges = self.local_use_ranges_at_cursor(&info);
        if ranges.is_empty() {
            let Some(symbol) = self.canonical_symbol_at_cursor(&info) else {
                return false;
            };
            ranges = find_references(&info.snapshot, &symbol, &CancellationToken::new())
                .into_iter()
                .filter(|u| u.file == self.path)
                .filter_map(|u| {
                    let start = self.buffer.offset(Position::new(u.line, u.column))?;
                    Some(start..start + u.length as usize)
                })
                .collect();
        }
        self.rename.set_selections(ranges);
        self.rename.activate_at(self.cursor)
    }

    /// Rename every usage of the symbol under the cursor to `replacement`.
    pub fn rename_usages_now(&mut self, replacement: &str) -> Result<Vec<FileEdits>> {
        let info = self.current_semantic_info();
        let Some(symbol) = self.canonical_symbol_at_cursor(&info) else {
            return Ok(Vec::new());
        };
        self.rename_symbol(&info, &symbol, replacement)
    }

    /// Rename every usage of `symbol` as seen by `info`.
    ///
    /// Occurrences in this file are replaced as one undo step; the edits for
    /// other files are returned grouped per file. Nothing happens for an
    /// anonymous symbol.
    pub fn rename_symbol(
        &mut self,
        info: &SemanticInfo,
        symbol: &SymbolRef,
        replacement: &str,
    ) -> Result<Vec<FileEdits>> {
        if symbol.name().is_none_or(str::is_empty) {
            return Ok(Vec::new());
        }
        let usages = find_references(&info.snapshot, symbol, &CancellationToken::new());
        self.emit(EditorEvent::UsagesFound(usages.clone()));

        let mut local: Vec<Range<usize>> = Vec::new();
        let mut others: FxHashMap<FilePath, Vec<TextEdit>> = FxHashMap::default();
        for usage in usages {
            if usage.file == self.path {
                if let Some(start) = self.buffer.offset(Position::new(usage.line, usage.column)) {
                    local.push(start..start + usage.length as usize);
                }
                continue;
            }
            others.entry(usage.file.clone()).or_default().push(TextEdit {
                line: usage.line,
                column: usage.column,
                length: usage.length,
                replacement: replacement.to_string(),
            });
        }

        if !local.is_empty() {
            self.rename.abort();
            local.sort_by_key(|r| std::cmp::Reverse(r.start));
            self.buffer.begin_edit_block();
            for range in local {
                let change = self.buffer.replace(range, replacement);
                if self.cursor >= change.position + change.removed {
                    self.cursor = self.cursor + change.added - change.removed;
                } else if self.cursor > change.position {
                    self.cursor = change.position;
                }
            }
            self.buffer.end_edit_block();
            self.rehighlight(false)?;
        }

        let mut edits: Vec<FileEdits> = others
            .into_iter()
            .map(|(file, edits)| FileEdits { file, edits })
            .collect();
        edits.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(edits)
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.mark_search.cancel();
        self.usage_search.cancel();
        self.highlighter.abort();
        self.cache.editor_closed(&self.path);
        debug!(path = %self.path, "editor closed");
    }
}
