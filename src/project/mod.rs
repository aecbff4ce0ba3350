//! Project-level state: the source cache that owns the current snapshot,
//! its configuration and the errors loading can produce.

mod config;
mod error;
mod source_cache;

pub use config::ModelConfig;
pub use error::{ModelError, Result};
pub use source_cache::SourceCache;
