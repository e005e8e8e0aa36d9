//! Status store
//!
//! The single authoritative record of every job in a batch. Records live in an
//! arena indexed by job id and only change through `compare_and_set`, so a
//! worker and a concurrent cancel or retry can never both win the same
//! transition. The lock is never held across a generator call.

use atelier_core::domain::batch::BatchSummary;
use atelier_core::domain::job::{Job, JobId, JobStatus};
use atelier_core::domain::variant::{ImageRef, VariantSpec};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::warn;

/// Status change applied by `StatusStore::compare_and_set`
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Enter `Running`, starting a new attempt
    Start,
    /// Settle to `Done` with the generated image
    Complete(ImageRef),
    /// Settle to `Error` with the failure message
    Fail(String),
    /// Settle a never-started job to `Cancelled`
    Cancel,
}

impl Transition {
    /// Status the job holds after this transition
    pub fn target(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Running,
            Transition::Complete(_) => JobStatus::Done,
            Transition::Fail(_) => JobStatus::Error,
            Transition::Cancel => JobStatus::Cancelled,
        }
    }
}

/// Thread-safe map from job id to job record
pub struct StatusStore {
    jobs: Mutex<Vec<Job>>,
    progress: watch::Sender<BatchSummary>,
}

impl StatusStore {
    /// Creates a store with one `Pending` job per spec
    ///
    /// Jobs are numbered from `#1` in spec order.
    pub fn new(specs: Vec<VariantSpec>) -> Self {
        let jobs: Vec<Job> = specs
            .into_iter()
            .zip(1..)
            .map(|(spec, id)| Job::pending(JobId(id), spec))
            .collect();
        let (progress, _) = watch::channel(BatchSummary::from_jobs(&jobs));

        Self {
            jobs: Mutex::new(jobs),
            progress,
        }
    }

    fn jobs(&self) -> MutexGuard<'_, Vec<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of jobs in the batch
    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// All job ids in dispatch order
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs().iter().map(|job| job.id).collect()
    }

    /// Returns a copy of one job record
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs().get(id.index()).filter(|job| job.id == id).cloned()
    }

    /// Returns the current status of one job
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs()
            .get(id.index())
            .filter(|job| job.id == id)
            .map(|job| job.status)
    }

    /// Immutable copy of every job record, ordered by id
    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs().clone()
    }

    /// Aggregate counts as of the latest accepted transition
    pub fn summary(&self) -> BatchSummary {
        *self.progress.borrow()
    }

    /// Receiver notified after every accepted transition
    pub fn subscribe(&self) -> watch::Receiver<BatchSummary> {
        self.progress.subscribe()
    }

    /// Applies `transition` only if the job currently holds `expected`
    ///
    /// Returns false, leaving the record untouched, when the id is unknown, the
    /// status does not match, or the edge is not part of the job state machine.
    pub fn compare_and_set(&self, id: JobId, expected: JobStatus, transition: Transition) -> bool {
        let mut jobs = self.jobs();
        {
            let Some(job) = jobs.get_mut(id.index()).filter(|job| job.id == id) else {
                return false;
            };

            if job.status != expected {
                return false;
            }

            let target = transition.target();
            if !expected.can_transition_to(target) {
                warn!("Refusing transition of job {} from {} to {}", id, expected, target);
                return false;
            }

            let now = chrono::Utc::now();
            match transition {
                Transition::Start => {
                    job.attempt += 1;
                    job.result = None;
                    job.error_message = None;
                    job.started_at = Some(now);
                    job.completed_at = None;
                }
                Transition::Complete(image) => {
                    job.result = Some(image);
                    job.completed_at = Some(now);
                }
                Transition::Fail(message) => {
                    job.error_message = Some(message);
                    job.completed_at = Some(now);
                }
                Transition::Cancel => {
                    job.completed_at = Some(now);
                }
            }
            job.status = target;
        }

        // Published under the lock so summaries are never observed out of order
        self.progress.send_replace(BatchSummary::from_jobs(jobs.iter()));
        true
    }
}
