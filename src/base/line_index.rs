//! Offset <-> line/column conversion for editor text.

use super::Position;

/// Precomputed line starts for a text buffer.
///
/// Offsets are byte offsets; the returned [`Position`] is 1-based in both
/// line and column, with the column counted in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert an offset into a position. Offsets past the end clamp to the end.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line as u32 + 1, (offset - self.line_starts[line]) as u32 + 1)
    }

    /// Offset of the first byte of a 1-based line.
    pub fn line_start(&self, line: u32) -> Option<usize> {
        let idx = (line as usize).checked_sub(1)?;
        self.line_starts.get(idx).copied()
    }

    /// Convert a 1-based position into an offset, clamped to the text length.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let start = self.line_start(position.line)?;
        let column = position.column.saturating_sub(1) as usize;
        Some((start + column).min(self.len))
    }
}
