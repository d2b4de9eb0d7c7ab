//! Error types for quarry-core

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::reporting::EventContext;

/// Result type alias for quarry operations
pub type Result<T> = std::result::Result<T, Error>;

/// An error shared between a failure report and the outcome of a workset.
///
/// The same failure is delivered to the error handler and to whoever awaits
/// the workset, so it is reference-counted rather than cloned.
pub type SharedError = Arc<Error>;

/// Errors that can occur in quarry
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O failure on a specific path
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path that was being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// Input could not be parsed
    #[error("Parse error: {message}")]
    Parse {
        /// What could not be parsed
        message: String,
    },

    /// A generic operation failure
    #[error("Operation failed: {message}")]
    Operation {
        /// Human-readable error message
        message: String,
    },

    /// The underlying index engine rejected an operation
    #[error("Index engine error: {message}")]
    Engine {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An API was called out of sequence (programming error)
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Which precondition was violated
        message: String,
    },

    /// Committing pending index changes failed
    #[error("Unable to commit {context}: {source}")]
    Commit {
        /// Index the commit was issued for
        context: EventContext,
        /// Failure raised by the index writer
        #[source]
        source: Box<Error>,
    },

    /// One or more release actions failed while shutting down
    #[error("{message}: {source}{}", suppressed_summary(.suppressed))]
    Shutdown {
        /// What was being shut down
        message: String,
        /// The first failure
        #[source]
        source: Box<Error>,
        /// Failures raised after the first one, in order
        suppressed: Vec<Error>,
    },

    /// Work was submitted to something that no longer accepts it
    #[error("{context} is closed and no longer accepts work")]
    Closed {
        /// Index that was closed
        context: EventContext,
    },
}

fn suppressed_summary(suppressed: &[Error]) -> String {
    if suppressed.is_empty() {
        String::new()
    } else {
        format!(" ({} more failure(s) suppressed)", suppressed.len())
    }
}

impl Error {
    /// Creates an I/O error carrying the path that failed.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new parse error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    /// Creates a new operation error.
    pub fn operation<S: Into<String>>(message: S) -> Self {
        Error::Operation {
            message: message.into(),
        }
    }

    /// Creates a new index engine error without a source.
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Error::Engine {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new index engine error with a source error.
    pub fn engine_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Engine {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new illegal state error.
    pub fn illegal_state<S: Into<String>>(message: S) -> Self {
        Error::IllegalState {
            message: message.into(),
        }
    }

    /// Wraps a writer failure raised while committing `context`.
    pub fn commit(context: EventContext, source: Error) -> Self {
        Error::Commit {
            context,
            source: Box::new(source),
        }
    }

    /// Creates a closed error for `context`.
    pub fn closed(context: EventContext) -> Self {
        Error::Closed { context }
    }

    /// Returns `true` for precondition violations.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState { .. })
    }
}
