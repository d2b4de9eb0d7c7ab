//! Failure reporting.
//!
//! Write failures in quarry are never thrown past the write path: they are
//! collected and handed to an [`ErrorHandler`] injected by whoever builds the
//! index. This module provides:
//!
//! - [`EventContext`]: identifies the index a failure belongs to
//! - [`WorkInfo`]: describes one unit of work in a report
//! - [`ContextualErrorHandler`]: collects failed and skipped works for one
//!   workset, then reports them exactly once
//! - [`ErrorHandler`]: the sink, with [`LoggingErrorHandler`] and
//!   [`CollectingErrorHandler`] implementations
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use quarry_core::{CollectingErrorHandler, ContextualErrorHandler, Error, EventContext, WorkInfo};
//!
//! let handler = Arc::new(CollectingErrorHandler::new());
//! let mut context = ContextualErrorHandler::new(handler.clone(), EventContext::index("books"));
//!
//! context.mark_as_failed(WorkInfo::new("add document 'b-1'"), Arc::new(Error::engine("boom")));
//! context.mark_as_skipped(WorkInfo::new("add document 'b-2'"));
//! context.handle();
//!
//! let reports = handler.reports();
//! assert_eq!(reports.len(), 1);
//! assert_eq!(reports[0].skipped.len(), 1);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::SharedError;

// ============================================================================
// EventContext
// ============================================================================

/// Identity of the index an event relates to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventContext {
    index_name: String,
}

impl EventContext {
    /// Create a context for the index with the given name.
    pub fn index(name: impl Into<String>) -> Self {
        Self {
            index_name: name.into(),
        }
    }

    /// Name of the index.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index '{}'", self.index_name)
    }
}

// ============================================================================
// WorkInfo
// ============================================================================

/// Human-readable description of a work, used only in failure reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkInfo(String);

impl WorkInfo {
    /// Create a new work description.
    pub fn new(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    /// The description as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// FailureReport
// ============================================================================

/// A work that failed, with the error it raised.
#[derive(Debug, Clone)]
pub struct FailedWork {
    /// Description of the work.
    pub info: WorkInfo,
    /// Error raised while executing the work.
    pub cause: SharedError,
}

/// Everything collected by one [`ContextualErrorHandler`].
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Index the failures belong to.
    pub context: EventContext,
    /// Works that were executed and failed, in submission order.
    pub failed: Vec<FailedWork>,
    /// Works that were not executed because an earlier work failed.
    pub skipped: Vec<WorkInfo>,
    /// Failures not attributable to a single work (e.g. a commit).
    pub errors: Vec<SharedError>,
}

impl FailureReport {
    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && self.errors.is_empty()
    }

    /// The first error recorded, work failures first.
    pub fn first_cause(&self) -> Option<&SharedError> {
        self.failed
            .first()
            .map(|failed| &failed.cause)
            .or_else(|| self.errors.first())
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} failed work(s), {} skipped work(s), {} other error(s)",
            self.context,
            self.failed.len(),
            self.skipped.len(),
            self.errors.len()
        )
    }
}

// ============================================================================
// ErrorHandler
// ============================================================================

/// Sink for failures that cannot be returned to a caller.
///
/// Implementations are shared by every processor of a backend and may be
/// called from several threads, one call at a time per processor.
pub trait ErrorHandler: Send + Sync {
    /// Handle the failures collected for one workset (or one commit).
    fn handle(&self, report: FailureReport);

    /// Handle a failure that has no workset to report it to.
    fn handle_exception(&self, message: &str, error: SharedError);
}

/// Error handler that logs every failure at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle(&self, report: FailureReport) {
        log::error!("{report}");
        for failed in &report.failed {
            log::error!("  failing work: {} ({})", failed.info, failed.cause);
        }
        for skipped in &report.skipped {
            log::error!("  skipped work: {skipped}");
        }
        for error in &report.errors {
            log::error!("  error: {error}");
        }
    }

    fn handle_exception(&self, message: &str, error: SharedError) {
        log::error!("{message} ({error:?})");
    }
}

/// Error handler that keeps every report in memory.
///
/// Useful in tests and for embedders that surface failures themselves.
#[derive(Debug, Default)]
pub struct CollectingErrorHandler {
    reports: Mutex<Vec<FailureReport>>,
    exceptions: Mutex<Vec<(String, SharedError)>>,
}

impl CollectingErrorHandler {
    /// Create an empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received through [`ErrorHandler::handle`], in order.
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Failures received through [`ErrorHandler::handle_exception`], in order.
    pub fn exceptions(&self) -> Vec<(String, SharedError)> {
        self.exceptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total number of calls received.
    pub fn call_count(&self) -> usize {
        self.reports().len() + self.exceptions().len()
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn handle(&self, report: FailureReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }

    fn handle_exception(&self, message: &str, error: SharedError) {
        self.exceptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((message.to_string(), error));
    }
}

// ============================================================================
// ContextualErrorHandler
// ============================================================================

/// Collects the failures of a single workset and reports them once.
///
/// Created lazily when the first failure of a workset happens. [`handle`]
/// consumes the context, so a context can never be reported twice.
///
/// [`handle`]: ContextualErrorHandler::handle
pub struct ContextualErrorHandler {
    handler: Arc<dyn ErrorHandler>,
    context: EventContext,
    failed: Vec<FailedWork>,
    skipped: Vec<WorkInfo>,
    errors: Vec<SharedError>,
}

impl ContextualErrorHandler {
    /// Create an empty context reporting to `handler`.
    pub fn new(handler: Arc<dyn ErrorHandler>, context: EventContext) -> Self {
        Self {
            handler,
            context,
            failed: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a work that was executed and failed.
    pub fn mark_as_failed(&mut self, info: WorkInfo, cause: SharedError) {
        self.failed.push(FailedWork { info, cause });
    }

    /// Record a work that was not executed.
    pub fn mark_as_skipped(&mut self, info: WorkInfo) {
        self.skipped.push(info);
    }

    /// Record a failure not attributable to a single work.
    pub fn add_error(&mut self, error: SharedError) {
        self.errors.push(error);
    }

    /// The error that opened this context, if any was recorded.
    pub fn originating_cause(&self) -> Option<&SharedError> {
        self.failed
            .first()
            .map(|failed| &failed.cause)
            .or_else(|| self.errors.first())
    }

    /// Flush everything collected to the error handler.
    ///
    /// Nothing is reported if nothing was recorded.
    pub fn handle(self) {
        let report = FailureReport {
            context: self.context,
            failed: self.failed,
            skipped: self.skipped,
            errors: self.errors,
        };
        if report.is_empty() {
            return;
        }
        self.handler.handle(report);
    }
}

impl fmt::Debug for ContextualErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextualErrorHandler")
            .field("context", &self.context)
            .field("failed", &self.failed.len())
            .field("skipped", &self.skipped.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
