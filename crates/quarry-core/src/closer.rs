//! Ordered resource release with aggregated failures.
//!
//! [`Closer`] runs release actions one after another. A failing action never
//! prevents the following ones from running; every failure is kept, and
//! [`Closer::finish`] turns them into a single [`Error::Shutdown`] whose
//! source is the first failure and whose `suppressed` list holds the rest.
//!
//! # Usage
//!
//! ```rust
//! use quarry_core::{Closer, Error};
//!
//! let mut closer = Closer::new();
//! closer
//!     .push(|| Err(Error::operation("writer lock lost")))
//!     .push(|| Ok(()))
//!     .push(|| Err(Error::operation("reader still in use")));
//!
//! let err = closer.finish("Failed to shut down index 'books'").unwrap_err();
//! assert!(err.to_string().contains("1 more failure(s) suppressed"));
//! ```

use crate::error::{Error, Result};

/// Runs release actions in order and aggregates their failures.
#[derive(Debug, Default)]
#[must_use = "failures are only surfaced by `finish`"]
pub struct Closer {
    failures: Vec<Error>,
}

impl Closer {
    /// Create a closer with no recorded failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a release action now, recording its failure if any.
    pub fn push<F>(&mut self, action: F) -> &mut Self
    where
        F: FnOnce() -> Result<()>,
    {
        if let Err(e) = action() {
            log::debug!("Release action failed: {e}");
            self.failures.push(e);
        }
        self
    }

    /// Number of failures recorded so far.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Finish closing.
    ///
    /// Returns `Ok(())` if every action succeeded, otherwise a single
    /// [`Error::Shutdown`] described by `message`.
    pub fn finish(self, message: impl Into<String>) -> Result<()> {
        let mut failures = self.failures.into_iter();
        match failures.next() {
            None => Ok(()),
            Some(first) => Err(Error::Shutdown {
                message: message.into(),
                source: Box::new(first),
                suppressed: failures.collect(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closer_all_succeed() {
        let mut closer = Closer::new();
        closer.push(|| Ok(())).push(|| Ok(()));
        assert_eq!(closer.failure_count(), 0);
        assert!(closer.finish("Failed to close").is_ok());
    }

    #[test]
    fn test_closer_runs_every_action_in_order() {
        let calls = RefCell::new(Vec::new());
        let mut closer = Closer::new();
        closer
            .push(|| {
                calls.borrow_mut().push("writer");
                Err(Error::operation("writer"))
            })
            .push(|| {
                calls.borrow_mut().push("queue");
                Ok(())
            })
            .push(|| {
                calls.borrow_mut().push("reader");
                Err(Error::operation("reader"))
            });

        assert_eq!(*calls.borrow(), vec!["writer", "queue", "reader"]);
        assert_eq!(closer.failure_count(), 2);

        let err = closer.finish("Failed to shut down index 'books'").unwrap_err();
        let Error::Shutdown {
            message,
            source,
            suppressed,
        } = err
        else {
            unreachable!("Expected Shutdown error variant");
        };
        assert_eq!(message, "Failed to shut down index 'books'");
        assert_eq!(source.to_string(), "Operation failed: writer");
        assert_eq!(suppressed.len(), 1);
        assert_eq!(suppressed[0].to_string(), "Operation failed: reader");
    }
}
