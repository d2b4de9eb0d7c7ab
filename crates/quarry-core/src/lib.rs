//! Quarry Core: shared errors, failure reporting, and resource cleanup.
//!
//! This crate provides the foundational types used across all Quarry crates.
//! It has no internal Quarry dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`reporting`]: Event contexts, error handlers, and the per-workset
//!   containment context that collects failures before reporting them
//! - [`closer`]: Ordered release actions with aggregated failures

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod closer;
pub mod error;
pub mod reporting;

// Re-export key types at crate root for convenience
pub use closer::Closer;
pub use error::{Error, Result, SharedError};
pub use reporting::{
    CollectingErrorHandler, ContextualErrorHandler, ErrorHandler, EventContext, FailedWork,
    FailureReport, LoggingErrorHandler, WorkInfo,
};
