//! IDE features: the editor-facing side of the semantic model.
//!
//! Everything here works on a [`SemanticInfo`] (a checked document plus the
//! snapshot it was checked against) and the raw editor text, so queries stay
//! consistent with what the user sees even while the cache moves on.
//!
//! - [`EditorSession`] - buffer, cursor and result handling for one editor
//! - [`SemanticHighlighter`] - background worker producing [`SemanticInfo`]
//! - [`LinkResolver`] - find-definition and declaration/definition switching
//! - [`find_references`] / [`UsageSearch`] - cross-file usages, cancellable
//! - [`RenameSession`] - in-place rename with mirrored edits

mod canonical;
mod editor;
mod expression;
mod highlighter;
mod link;
mod mailbox;
mod references;
mod rename;
mod semantic_info;
mod text_buffer;
mod usages;

pub use canonical::{canonical_macro, canonical_symbol, scope_and_expression, select_canonical};
pub use editor::{EditorEvent, EditorSession, FileEdits, TextEdit};
pub use expression::{expression_under_cursor, extend_over_call, matching_paren, touches_identifier};
pub use highlighter::SemanticHighlighter;
pub use link::{
    Link, LinkResolver, find_definition, find_macro_link, find_matching_declaration,
    link_to_symbol, skip_forward_declarations,
};
pub use mailbox::Mailbox;
pub use references::{Usage, find_macro_usages, find_references, references_in_document};
pub use rename::RenameSession;
pub use semantic_info::{SemanticInfo, SemanticInfoSource};
pub use text_buffer::{Change, Key, TextBuffer};
pub use usages::{SearchResult, UsageSearch};
