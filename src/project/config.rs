//! Model configuration.

use crate::base::FilePath;
use crate::parser::Macro;

/// Settings for a [`SourceCache`](super::SourceCache) and the workers built on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Directories searched for `#include` targets, in order.
    pub include_paths: Vec<FilePath>,
    /// Macros defined before every file is preprocessed.
    pub predefined_macros: Vec<Macro>,
    /// Number of closed editors after which the cache collects garbage.
    pub gc_threshold: usize,
    /// Extensions (without dot) treated as headers.
    pub header_extensions: Vec<String>,
    /// Extensions (without dot) treated as sources.
    pub source_extensions: Vec<String>,
    /// Name of the semantic highlighter thread.
    pub worker_thread_name: String,
    /// Stack size of the semantic highlighter thread, in bytes.
    pub worker_stack_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            predefined_macros: Vec::new(),
            gc_threshold: 5,
            header_extensions: ["h", "hh", "hpp", "hxx", "h++"].map(String::from).to_vec(),
            source_extensions: ["c", "cc", "cpp", "cxx", "c++"].map(String::from).to_vec(),
            worker_thread_name: "cpp-semantic-highlighter".to_string(),
            worker_stack_size: 8 * 1024 * 1024,
        }
    }
}

impl ModelConfig {
    pub fn with_include_path(mut self, path: impl Into<FilePath>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    /// Add an object-like macro, as `-DNAME=body` would.
    pub fn define(mut self, name: &str, body: &str) -> Self {
        self.predefined_macros.push(Macro {
            name: name.into(),
            file: FilePath::new("<configuration>"),
            line: 0,
            offset: 0,
            params: None,
            variadic: false,
            body: body.to_string(),
        });
        self
    }

    pub fn is_header(&self, path: &FilePath) -> bool {
        path.extension()
            .is_some_and(|ext| self.header_extensions.iter().any(|h| h == ext))
    }

    pub fn is_source(&self, path: &FilePath) -> bool {
        path.extension()
            .is_some_and(|ext| self.source_extensions.iter().any(|s| s == ext))
    }

    /// Whether the cache should pick the file up when loading a directory.
    pub fn is_cpp_file(&self, path: &FilePath) -> bool {
        self.is_header(path) || self.is_source(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.gc_threshold, 5);
        assert_eq!(config.worker_stack_size, 8 * 1024 * 1024);
        assert!(config.is_header(&FilePath::new("/a/b.h")));
        assert!(config.is_source(&FilePath::new("/a/b.cpp")));
        assert!(!config.is_cpp_file(&FilePath::new("/a/b.txt")));
    }

    #[test]
    fn test_define_builds_object_like_macro() {
        let config = ModelConfig::default().define("QT_DEBUG", "1");
        let m = &config.predefined_macros[0];
        assert_eq!(m.name, "QT_DEBUG");
        assert!(!m.is_function_like());
    }
}
