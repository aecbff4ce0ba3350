//! Foundation types for the C++ model.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FilePath`] - Cheap-to-clone, normalized file identity
//! - [`Position`], [`Span`] - 1-based line/column positions
//! - [`LineIndex`] - Byte offset <-> line/column conversion for editor text
//! - [`text_utils`] - Identifier scanning helpers shared by the IDE layer
//!
//! This module has NO dependencies on other modules of the crate.

mod file_path;
mod line_index;
mod position;
pub mod text_utils;

pub use file_path::FilePath;
pub use line_index::LineIndex;
pub use position::{Position, Span};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
