//! Batch DTOs for the UI layer

use serde::{Deserialize, Serialize};

use crate::domain::batch::{BatchId, BatchSummary};
use crate::domain::job::Job;

/// Point-in-time progress report of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub summary: BatchSummary,
    pub jobs: Vec<Job>,
}

impl BatchReport {
    /// Builds a report from a job snapshot
    pub fn new(batch_id: BatchId, jobs: Vec<Job>) -> Self {
        Self {
            batch_id,
            generated_at: chrono::Utc::now(),
            summary: BatchSummary::from_jobs(&jobs),
            jobs,
        }
    }
}
