//! C++ front-end: lexer, preprocessor, parser and AST.
//!
//! Nothing in here knows about symbols or documents. The pipeline is
//!
//! ```text
//! raw text -> preprocess() -> PreprocessedSource -> read_tokens() -> parse_translation_unit()
//! ```
//!
//! and every stage records problems as [`DiagnosticMessage`]s instead of
//! failing.

pub mod ast;
mod ast_path;
mod diagnostics;
mod directives;
mod lexer;
mod parser;
mod preprocessor;
mod token_kind;
mod translation_unit;

pub use ast_path::{AstNode, AstPath};
pub use diagnostics::{DiagnosticMessage, Severity};
pub use directives::{Include, IncludeKind, Macro, MacroUse};
pub use lexer::{Lexer, Token, token_at, tokenize, tokenize_line};
pub use parser::{parse_expression, parse_translation_unit};
pub use preprocessor::{IncludeEnvironment, NoIncludes, PreprocessedSource, preprocess};
pub use token_kind::TokenKind;
pub use translation_unit::{TuToken, read_tokens};
