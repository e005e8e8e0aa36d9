//! Error types for the batch orchestrator
//!
//! Only misuse of the API surfaces as an error. Generator failures are recorded
//! on the job they belong to and never reach the caller through these types.

use atelier_core::domain::job::{JobId, JobStatus};
use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors returned by batch operations
#[derive(Debug, Error)]
pub enum BatchError {
    /// Invalid arguments to `start_batch`; the batch never starts
    #[error("Invalid batch configuration: {0}")]
    Configuration(String),

    /// The job id is not part of the batch
    #[error("Job {0} not found in batch")]
    NotFound(JobId),

    /// The job cannot be retried from its current status
    #[error("Job {id} cannot be retried while {status}")]
    InvalidState {
        /// Job that was targeted
        id: JobId,
        /// Status observed when the retry was refused
        status: JobStatus,
    },
}

impl BatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error is an invalid state error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

/// Returned by `JobQueue::push` once the queue has been closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Job queue is closed, rejected job {0}")]
pub struct QueueClosed(pub JobId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(BatchError::NotFound(JobId(9)).is_not_found());
        assert!(
            BatchError::InvalidState {
                id: JobId(1),
                status: JobStatus::Done,
            }
            .is_invalid_state()
        );
        assert!(!BatchError::configuration("empty").is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = BatchError::InvalidState {
            id: JobId(2),
            status: JobStatus::Running,
        };
        assert_eq!(err.to_string(), "Job #2 cannot be retried while running");
        assert_eq!(
            BatchError::NotFound(JobId(7)).to_string(),
            "Job #7 not found in batch"
        );
    }
}
