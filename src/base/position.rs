/// Position tracking for tokens, symbols and uses.
///
/// Lines and columns are both 1-based, which is the convention the C++ front-end
/// reports token positions in. Column 0 is reserved for "start of line" in
/// navigation targets that have no precise column.

/// A span between two positions (end is exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source code (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a span from line/column coordinates
    pub fn from_coords(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        }
    }

    /// Check if a position falls within this span (start inclusive, end exclusive).
    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }

    /// Like [`Span::contains`] but also accepts the end position.
    pub fn contains_inclusive(&self, position: Position) -> bool {
        position >= self.start && position <= self.end
    }

    /// Check whether `other` lies entirely inside this span.
    pub fn encloses(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}
