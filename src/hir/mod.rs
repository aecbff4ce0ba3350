//! Semantic model of checked documents.
//!
//! - [`Document`] - one file's tokens, AST, symbol table, macros and includes
//! - [`Snapshot`] - persistent path → document map used for cross-file queries
//! - [`SymbolTable`] - per-document arena of symbols and scopes
//! - [`LookupContext`] / [`TypeOfExpression`] - name and expression resolution
//! - [`LocalSymbols`] - classified uses inside one function body
//!
//! Depends on `base` and `parser` only.

mod bind;
mod document;
mod local_uses;
mod lookup;
mod snapshot;
mod symbols;
mod type_of;
pub mod walk;

pub use document::{Document, SymbolRef};
pub use local_uses::{LocalSymbols, LocalUseMap, SymbolKey, Use, UseKind, is_unused};
pub use lookup::{Binding, LookupContext, LookupItem, ScopeRef};
pub use snapshot::{FxHamt, Snapshot, SnapshotEnvironment};
pub use symbols::{
    FullType, FunctionType, Scope, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTable,
};
pub use type_of::TypeOfExpression;
pub use walk::{FunctionBody, NameOccurrence, NameRole, function_at};
