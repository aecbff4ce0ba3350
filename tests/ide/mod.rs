//! IDE feature tests
//!
//! Tests for:
//! - Find-definition links and declaration/definition switching
//! - The background semantic highlighter
//! - Usages, occurrence marking and rename through an editor session

pub mod tests_editor;
pub mod tests_highlighter;
pub mod tests_links;
pub mod tests_rename;
pub mod tests_usages;
