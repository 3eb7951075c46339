//! Source layer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or querying a source index.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The index is still being built; callers treat this as "no match".
    #[error("Source index is not ready")]
    NotReady,

    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File parsing error.
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
