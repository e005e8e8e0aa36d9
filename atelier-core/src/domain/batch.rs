//! Batch domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Job, JobStatus};

/// Identifier of a batch of generation jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregate status counts for a batch
///
/// `pending + running + done + error + cancelled == total` always holds for a
/// summary built from a full snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub error: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    /// Counts job statuses
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        Self::from_statuses(jobs.into_iter().map(|job| job.status))
    }

    pub fn from_statuses(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.total += 1;
            match status {
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Running => summary.running += 1,
                JobStatus::Done => summary.done += 1,
                JobStatus::Error => summary.error += 1,
                JobStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    /// Number of jobs in a terminal state
    pub fn settled(&self) -> usize {
        self.done + self.error + self.cancelled
    }

    /// True once no job is pending or running
    pub fn is_complete(&self) -> bool {
        self.pending == 0 && self.running == 0
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} settled (done: {}, error: {}, cancelled: {}, running: {})",
            self.settled(),
            self.total,
            self.done,
            self.error,
            self.cancelled,
            self.running
        )
    }
}
