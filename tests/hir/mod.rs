//! Semantic model tests across files.

pub mod tests_cross_file;
