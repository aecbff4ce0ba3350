//! In-place rename: typing inside one occurrence mirrors the edit to all.
//!
//! The session tracks byte ranges of every occurrence of the renamed symbol
//! in the editor buffer and keeps them in sync with each [`Change`]. All
//! keystrokes of one session, mirrored copies included, form one undo step.

use std::ops::Range;

use tracing::trace;

use super::text_buffer::{Change, Key, TextBuffer};

#[derive(Debug, Clone)]
pub struct RenameSession {
    selections: Vec<Range<usize>>,
    current: Option<usize>,
    first_change: bool,
    /// The last change happened inside the current selection.
    in_rename_changed: bool,
    /// Mirrored edits are being applied.
    in_rename: bool,
}

impl Default for RenameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RenameSession {
    pub fn new() -> Self {
        Self {
            selections: Vec::new(),
            current: None,
            first_change: true,
            in_rename_changed: false,
            in_rename: false,
        }
    }

    /// Replace the tracked occurrences. Ends any active rename.
    pub fn set_selections(&mut self, mut selections: Vec<Range<usize>>) {
        selections.sort_by_key(|r| r.start);
        selections.dedup();
        self.abort();
        self.selections = selections;
    }

    pub fn selections(&self) -> &[Range<usize>] {
        &self.selections
    }

    /// Start renaming the occurrence under `cursor`.
    pub fn activate_at(&mut self, cursor: usize) -> bool {
        self.current = self
            .selections
            .iter()
            .position(|r| r.start <= cursor && cursor <= r.end);
        self.first_change = true;
        self.in_rename_changed = false;
        self.current.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_range(&self) -> Option<Range<usize>> {
        self.current.map(|i| self.selections[i].clone())
    }

    pub fn abort(&mut self) {
        if self.current.take().is_some() {
            trace!("rename aborted");
        }
        self.selections.clear();
        self.first_change = true;
        self.in_rename_changed = false;
    }

    /// Route a keystroke through the session. Without an active rename the
    /// key goes straight to the buffer.
    pub fn handle_key(&mut self, buffer: &mut TextBuffer, cursor: &mut usize, key: Key) -> Option<Change> {
        let Some(range) = self.current_range() else {
            return buffer.apply_key(cursor, key);
        };
        let at = *cursor;
        match key {
            Key::Enter | Key::Escape => {
                self.abort();
                return None;
            }
            Key::Home if at > range.start && at <= range.end => {
                *cursor = range.start;
                return None;
            }
            Key::End if at >= range.start && at < range.end => {
                *cursor = range.end;
                return None;
            }
            Key::Backspace if at == range.start => return None,
            Key::Delete if at == range.end => return None,
            _ => {}
        }

        if at < range.start || at > range.end {
            let change = buffer.apply_key(cursor, key);
            if let Some(change) = change {
                self.on_contents_changed(change);
            }
            return change;
        }

        if self.first_change {
            buffer.begin_edit_block();
        } else {
            buffer.join_previous_edit_block();
        }
        self.first_change = false;
        let change = buffer.apply_key(cursor, key);
        if let Some(change) = change {
            self.on_contents_changed(change);
            self.finish_rename(buffer);
        }
        buffer.end_edit_block();
        change
    }

    /// Keep the tracked ranges in step with an edit of the buffer. An edit
    /// outside the current occurrence ends the rename.
    pub fn on_contents_changed(&mut self, change: Change) {
        if self.current.is_none() {
            return;
        }
        for range in &mut self.selections {
            range.start = shift(range.start, change);
            range.end = shift(range.end, change);
        }
        if self.in_rename {
            return;
        }
        let Some(current) = self.current else { return };

        let range = &mut self.selections[current];
        if change.position + change.added == range.start {
            range.start = change.position;
        }
        self.in_rename_changed =
            change.position >= range.start && change.position + change.added <= range.end;
        if !self.in_rename_changed {
            self.abort();
        }
    }

    /// Copy the current occurrence's text over every other occurrence.
    pub fn finish_rename(&mut self, buffer: &mut TextBuffer) {
        if !self.in_rename_changed {
            return;
        }
        let Some(current) = self.current else { return };
        self.in_rename = true;
        buffer.join_previous_edit_block();

        let source = self.selections[current].clone();
        let text = buffer.text()[source].to_string();
        for i in 0..self.selections.len() {
            if i == current {
                continue;
            }
            let target = self.selections[i].clone();
            let change = buffer.replace(target.clone(), &text);
            self.on_contents_changed(change);
            self.selections[i] = target.start..target.start + text.len();
        }

        buffer.end_edit_block();
        self.in_rename = false;
    }
}

/// Where a position ends up after `change`. Positions inside the replaced
/// text, or at its start, move past the inserted text.
fn shift(position: usize, change: Change) -> usize {
    if position < change.position {
        position
    } else if position <= change.position + change.removed {
        change.position + change.added
    } else {
        position - change.removed + change.added
    }
}
