//! # cpp-model
//!
//! Incremental semantic model of C++ sources for an editor.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → editor session, highlighter worker, links, usages, rename
//!   ↓
//! project   → SourceCache, disk loading, GC policy
//!   ↓
//! hir       → Document, Snapshot, symbols, lookup, local uses
//!   ↓
//! parser    → Logos lexer, preprocessor, recursive-descent parser, AST
//!   ↓
//! base      → Primitives (FilePath, Position, LineIndex)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → hir → project → ide)
// ============================================================================

/// Foundation types: file paths, positions, line index
pub mod base;

/// Front-end: lexer, preprocessor, parser, AST
pub mod parser;

/// Semantic model: documents, snapshots, symbol tables, lookup
pub mod hir;

/// Shared source cache and configuration
pub mod project;

/// Editor features: highlighting, links, usages, rename
pub mod ide;

// Re-export foundation types
pub use base::{FilePath, LineIndex, Position, Span};
pub use hir::{Document, Snapshot};
pub use ide::{EditorEvent, EditorSession, Link, SemanticHighlighter, SemanticInfo};
pub use project::{ModelConfig, ModelError, SourceCache};
