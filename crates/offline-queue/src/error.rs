//! Queue error types.

use offline_store::StoreError;
use thiserror::Error;

/// Errors from queue persistence.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A lock guarding the in-memory queue was poisoned.
    #[error("Queue lock poisoned")]
    LockPoisoned,
}

/// Errors replaying a single action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// The backend rejected the action.
    #[error("{kind} rejected: {message}")]
    Rejected { kind: String, message: String },

    /// The backend could not be reached.
    #[error("{kind} could not be delivered: {message}")]
    Unreachable { kind: String, message: String },
}

impl ReplayError {
    pub fn rejected(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn unreachable(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
