//! Error types for project-level operations.
//!
//! Semantic queries never fail; they return `Option` or empty results. Only
//! loading files and starting workers can.

use thiserror::Error;

use crate::base::FilePath;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Reading a file from disk failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: FilePath,
        #[source]
        source: std::io::Error,
    },

    /// The path is not a loadable file or directory.
    #[error("Unknown path: {0}")]
    UnknownPath(FilePath),

    /// The worker thread could not be started.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker was aborted and accepts no more requests.
    #[error("Semantic worker has shut down")]
    WorkerShutdown,
}

impl ModelError {
    pub fn io(path: &FilePath, source: std::io::Error) -> Self {
        Self::Io {
            path: path.clone(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
