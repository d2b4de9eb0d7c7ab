//! Common types for the write path.
//!
//! These types are shared by the processor, the work sets and the
//! orchestrator, and are always available regardless of feature flags.

use std::fmt;

use quarry_core::SharedError;
use serde::{Deserialize, Serialize};

/// Whether a workset must be committed before it is reported as successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCommitStrategy {
    /// Changes are committed whenever the processor decides to.
    #[default]
    None,
    /// Changes are committed before the workset completes.
    Force,
}

/// Whether a workset's changes must be visible to searches before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRefreshStrategy {
    /// Readers pick up changes whenever they are refreshed.
    #[default]
    None,
    /// Readers are refreshed before the workset completes.
    Force,
}

impl fmt::Display for DocumentCommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Force => write!(f, "force"),
        }
    }
}

impl fmt::Display for DocumentRefreshStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Force => write!(f, "force"),
        }
    }
}

/// What happened to a single submitted work.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum WorkOutcome<T> {
    /// The work ran and produced a result.
    Executed(T),
    /// The work ran and failed; the failure is recorded for its workset.
    Failed,
    /// The work did not run because an earlier work of its workset failed.
    Skipped,
}

impl<T> WorkOutcome<T> {
    /// The work's result, if it ran successfully.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Executed(value) => Some(value),
            Self::Failed | Self::Skipped => None,
        }
    }

    /// Returns `true` if the work ran successfully.
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed(_))
    }

    /// Returns `true` if the work ran and failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns `true` if the work was not run.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Outcome of a whole workset, as delivered to whoever submitted it.
pub type WorkSetResult<T> = std::result::Result<T, SharedError>;

/// Sending half of a workset's outcome.
pub type WorkSetFuture<T> = tokio::sync::oneshot::Sender<WorkSetResult<T>>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_defaults() {
        assert_eq!(DocumentCommitStrategy::default(), DocumentCommitStrategy::None);
        assert_eq!(
            DocumentRefreshStrategy::default(),
            DocumentRefreshStrategy::None
        );
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&DocumentCommitStrategy::Force).unwrap();
        assert_eq!(json, "\"force\"");

        let strategy: DocumentRefreshStrategy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(strategy, DocumentRefreshStrategy::None);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(DocumentCommitStrategy::Force.to_string(), "force");
        assert_eq!(DocumentRefreshStrategy::None.to_string(), "none");
    }

    #[test]
    fn test_work_outcome_predicates() {
        let executed = WorkOutcome::Executed(42);
        assert!(executed.is_executed());
        assert_eq!(executed.into_option(), Some(42));

        let failed: WorkOutcome<i32> = WorkOutcome::Failed;
        assert!(failed.is_failed());
        assert_eq!(failed.into_option(), None);

        let skipped: WorkOutcome<i32> = WorkOutcome::Skipped;
        assert!(skipped.is_skipped());
        assert_eq!(skipped.into_option(), None);
    }
}
