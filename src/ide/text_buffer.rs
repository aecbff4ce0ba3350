//! Editor text with a monotonic revision and grouped undo/redo.
//!
//! Every edit outside an edit block is its own undo step. Edits made between
//! [`TextBuffer::begin_edit_block`] and [`TextBuffer::end_edit_block`] form a
//! single step, and [`TextBuffer::join_previous_edit_block`] reopens the last
//! step so later edits are undone together with it.
//!
//! Line lookups go through a [`Rope`] kept in step with the text, so mapping
//! the cursor after a keystroke does not rescan the buffer.

use std::ops::Range;

use ropey::Rope;

use crate::base::Position;

/// What an edit did, in post-edit terms: `removed` bytes at `position` were
/// replaced by `added` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub position: usize,
    pub removed: usize,
    pub added: usize,
}

/// A keystroke the editor forwards to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Home,
    End,
    Backspace,
    Delete,
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Edit {
    position: usize,
    removed: String,
    inserted: String,
}

#[derive(Debug, Clone)]
pub struct TextBuffer {
    text: String,
    /// Same content as `text`; only `\n` breaks lines.
    lines: Rope,
    revision: u32,
    undo: Vec<Vec<Edit>>,
    redo: Vec<Vec<Edit>>,
    block_depth: usize,
    open_group: Vec<Edit>,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl TextBuffer {
    /// A buffer at revision 1 with empty undo history.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            lines: Rope::from_str(&text),
            text,
            revision: 1,
            undo: Vec::new(),
            redo: Vec::new(),
            block_depth: 0,
            open_group: Vec::new(),
        }
    }

    /// The whole text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bumped by every change, undo and redo included; never decreases.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// No text at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines; a trailing newline starts an empty last line.
    pub fn line_count(&self) -> usize {
        self.lines.len_lines()
    }

    /// 1-based line and byte column of `offset`, clamped to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.lines.byte_to_line(offset);
        let start = self.lines.line_to_byte(line);
        Position::new(line as u32 + 1, (offset - start) as u32 + 1)
    }

    /// Byte offset of a 1-based position, clamped to the end; `None` past the
    /// last line.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let line = (position.line as usize).checked_sub(1)?;
        if line >= self.lines.len_lines() {
            return None;
        }
        let start = self.lines.line_to_byte(line);
        let column = position.column.saturating_sub(1) as usize;
        Some((start + column).min(self.text.len()))
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Replace `range` with `replacement`. Offsets inside a character snap
    /// back to its start.
    pub fn replace(&mut self, range: Range<usize>, replacement: &str) -> Change {
        let start = self.floor(range.start);
        let end = self.floor(range.end).max(start);
        let removed = self.text[start..end].to_string();
        self.splice(start..end, replacement);
        self.revision += 1;

        let edit = Edit {
            position: start,
            removed,
            inserted: replacement.to_string(),
        };
        let change = edit.change();
        if self.block_depth > 0 {
            self.open_group.push(edit);
        } else {
            self.undo.push(vec![edit]);
        }
        self.redo.clear();
        change
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Change {
        self.replace(offset..offset, text)
    }

    /// Delete the bytes in `range`.
    pub fn remove(&mut self, range: Range<usize>) -> Change {
        self.replace(range, "")
    }

    /// Replace the whole text as one undo step.
    pub fn set_text(&mut self, text: &str) -> Change {
        self.replace(0..self.text.len(), text)
    }

    /// Start grouping edits into one undo step. Blocks nest.
    pub fn begin_edit_block(&mut self) {
        self.block_depth += 1;
    }

    /// Open a block that continues the previous undo step.
    pub fn join_previous_edit_block(&mut self) {
        if self.block_depth == 0 {
            if let Some(previous) = self.undo.pop() {
                self.open_group = previous;
            }
        }
        self.block_depth += 1;
    }

    /// Close the innermost block; the outermost one commits the group.
    pub fn end_edit_block(&mut self) {
        let Some(depth) = self.block_depth.checked_sub(1) else {
            return;
        };
        self.block_depth = depth;
        if depth == 0 && !self.open_group.is_empty() {
            self.undo.push(std::mem::take(&mut self.open_group));
        }
    }

    /// An edit block is open.
    pub fn is_in_edit_block(&self) -> bool {
        self.block_depth > 0
    }

    // ------------------------------------------------------------------------
    // Undo
    // ------------------------------------------------------------------------

    /// There is a step to undo and no block is open.
    pub fn can_undo(&self) -> bool {
        self.block_depth == 0 && !self.undo.is_empty()
    }

    /// There is a step to redo and no block is open.
    pub fn can_redo(&self) -> bool {
        self.block_depth == 0 && !self.redo.is_empty()
    }

    /// Revert the last undo step. Returns the changes applied, last edit
    /// first; empty when there is nothing to undo or a block is open.
    pub fn undo(&mut self) -> Vec<Change> {
        if !self.can_undo() {
            return Vec::new();
        }
        let Some(group) = self.undo.pop() else {
            return Vec::new();
        };
        let changes = group.iter().rev().map(|edit| self.revert(edit)).collect();
        self.redo.push(group);
        self.revision += 1;
        changes
    }

    /// Reapply the last undone step, first edit first.
    pub fn redo(&mut self) -> Vec<Change> {
        if !self.can_redo() {
            return Vec::new();
        }
        let Some(group) = self.redo.pop() else {
            return Vec::new();
        };
        let changes = group.iter().map(|edit| self.reapply(edit)).collect();
        self.undo.push(group);
        self.revision += 1;
        changes
    }

    fn revert(&mut self, edit: &Edit) -> Change {
        let end = edit.position + edit.inserted.len();
        self.splice(edit.position..end, &edit.removed);
        Change {
            position: edit.position,
            removed: edit.inserted.len(),
            added: edit.removed.len(),
        }
    }

    fn reapply(&mut self, edit: &Edit) -> Change {
        let end = edit.position + edit.removed.len();
        self.splice(edit.position..end, &edit.inserted);
        edit.change()
    }

    /// Replace `range` in both the text and the line rope. `range` lies on
    /// char boundaries.
    fn splice(&mut self, range: Range<usize>, replacement: &str) {
        let start = self.lines.byte_to_char(range.start);
        let end = self.lines.byte_to_char(range.end);
        self.lines.remove(start..end);
        self.lines.insert(start, replacement);
        self.text.replace_range(range, replacement);
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Apply a keystroke at `cursor`, moving the cursor. Returns the change
    /// if the text was modified.
    pub fn apply_key(&mut self, cursor: &mut usize, key: Key) -> Option<Change> {
        *cursor = self.floor((*cursor).min(self.text.len()));
        match key {
            Key::Char(c) => {
                let mut buf = [0u8; 4];
                let change = self.insert(*cursor, c.encode_utf8(&mut buf));
                *cursor += c.len_utf8();
                Some(change)
            }
            Key::Enter => {
                let change = self.insert(*cursor, "\n");
                *cursor += 1;
                Some(change)
            }
            Key::Backspace => {
                let previous = self.text[..*cursor].chars().next_back()?;
                let start = *cursor - previous.len_utf8();
                let change = self.remove(start..*cursor);
                *cursor = start;
                Some(change)
            }
            Key::Delete => {
                let next = self.text[*cursor..].chars().next()?;
                Some(self.remove(*cursor..*cursor + next.len_utf8()))
            }
            Key::Home => {
                *cursor = self.text[..*cursor].rfind('\n').map_or(0, |i| i + 1);
                None
            }
            Key::End => {
                *cursor = self.text[*cursor..]
                    .find('\n')
                    .map_or(self.text.len(), |i| *cursor + i);
                None
            }
            Key::Left => {
                if let Some(c) = self.text[..*cursor].chars().next_back() {
                    *cursor -= c.len_utf8();
                }
                None
            }
            Key::Right => {
                if let Some(c) = self.text[*cursor..].chars().next() {
                    *cursor += c.len_utf8();
                }
                None
            }
            Key::Escape => None,
        }
    }

    fn floor(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

impl Edit {
    fn change(&self) -> Change {
        Change {
            position: self.position,
            removed: self.removed.len(),
            added: self.inserted.len(),
        }
    }
}
