//! Source cache tests against files on disk.

pub mod tests_source_cache;
