//! Error types for quarry-cli

use std::path::PathBuf;

use quarry_core::SharedError;
use thiserror::Error;

/// Result type alias for quarry-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quarry-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from quarry-core
    #[error("Core error: {0}")]
    Core(#[from] quarry_core::Error),

    /// A work set queued by a command failed
    #[error("Index operation failed: {0}")]
    WorkSet(#[source] SharedError),

    /// A line of a JSON lines file is not a valid document
    #[error("Invalid document at {}:{line}: {source}", .path.display())]
    InvalidDocument {
        /// File being indexed
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Parse failure
        #[source]
        source: quarry_core::Error,
    },
}

impl From<SharedError> for Error {
    fn from(error: SharedError) -> Self {
        Error::WorkSet(error)
    }
}
