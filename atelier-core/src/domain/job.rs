//! Job domain types

use serde::{Deserialize, Serialize};

use crate::domain::variant::{ImageRef, VariantSpec};

/// Identifier of a job within its batch
///
/// Ids are 1-based ordinals in submission order, so `#1` is always dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

impl JobId {
    /// Returns the zero-based position of this job in its batch
    pub fn index(self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for JobId {
    fn from(value: u32) -> Self {
        JobId(value)
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
    Cancelled,
}

impl JobStatus {
    /// No further automatic transition happens from a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }

    /// Only failed or never-run jobs may be retried
    pub fn is_retriable(self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Cancelled)
    }

    /// Whether `self -> next` is an edge of the job state machine
    ///
    /// `Pending -> Running | Cancelled`, `Running -> Done | Error`, and
    /// `Error | Cancelled -> Running` for an explicit retry.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Done)
                | (Running, Error)
                | (Error, Running)
                | (Cancelled, Running)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Generation job record
///
/// One variant spec plus its execution status. Owned by the status store of
/// the batch it belongs to; callers only ever see copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub spec: VariantSpec,
    pub status: JobStatus,
    pub result: Option<ImageRef>,
    pub error_message: Option<String>,
    pub attempt: u32,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    /// Creates a job that has never been dispatched
    pub fn pending(id: JobId, spec: VariantSpec) -> Self {
        Self {
            id,
            spec,
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            attempt: 0,
            started_at: None,
            completed_at: None,
        }
    }

    /// Wall-clock duration of the latest attempt, if it has settled
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed.signed_duration_since(started)),
            _ => None,
        }
    }
}
