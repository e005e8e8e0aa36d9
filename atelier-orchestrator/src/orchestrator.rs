//! Batch orchestrator
//!
//! Public entry point of the crate. `Orchestrator::start_batch` turns a list
//! of variant specs into a running batch and returns a `BatchHandle`, through
//! which the caller watches progress, cancels, and retries individual jobs.

use atelier_core::Generator;
use atelier_core::domain::batch::{BatchId, BatchSummary};
use atelier_core::domain::job::{Job, JobId, JobStatus};
use atelier_core::domain::variant::VariantSpec;
use atelier_core::dto::batch::BatchReport;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{BatchError, Result};
use crate::pool::{self, WorkerPool};
use crate::queue::JobQueue;
use crate::store::{StatusStore, Transition};

/// Starts batches against a single generator
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn Generator>,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Starts a batch of generation jobs
    ///
    /// Every spec becomes a `Pending` job, numbered from `#1` in order, and
    /// `min(concurrency, specs.len())` workers start draining them. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    /// `BatchError::Configuration` if `specs` is empty or `concurrency` is 0.
    pub fn start_batch(&self, specs: Vec<VariantSpec>, concurrency: usize) -> Result<BatchHandle> {
        if specs.is_empty() {
            return Err(BatchError::configuration("at least one variant spec is required"));
        }
        if concurrency == 0 {
            return Err(BatchError::configuration("concurrency must be greater than 0"));
        }

        let batch_id = BatchId::new();
        let store = Arc::new(StatusStore::new(specs));
        let queue = Arc::new(JobQueue::new());

        for id in store.ids() {
            // The queue is fresh and only closed below
            if let Err(e) = queue.push(id) {
                warn!("Batch {}: {}", batch_id, e);
            }
        }
        queue.close();

        let workers = concurrency.min(store.len());
        let pool = WorkerPool::spawn(
            workers,
            Arc::clone(&queue),
            Arc::clone(&store),
            Arc::clone(&self.generator),
        );

        info!(
            "Started batch {} with {} job(s) across {} worker(s)",
            batch_id,
            store.len(),
            workers
        );

        Ok(BatchHandle {
            batch_id,
            queue,
            store,
            generator: Arc::clone(&self.generator),
            pool: Some(pool),
            retries: Mutex::new(JoinSet::new()),
        })
    }
}

/// Caller's handle on a running batch
///
/// Dropping the handle cancels every job that has not started yet; calls
/// already in flight still settle in the background.
pub struct BatchHandle {
    batch_id: BatchId,
    queue: Arc<JobQueue>,
    store: Arc<StatusStore>,
    generator: Arc<dyn Generator>,
    pool: Option<WorkerPool>,
    retries: Mutex<JoinSet<()>>,
}

impl BatchHandle {
    pub fn id(&self) -> BatchId {
        self.batch_id
    }

    /// Number of pool workers serving the batch
    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map(WorkerPool::size).unwrap_or(0)
    }

    /// Copy of every job record, ordered by id
    pub fn snapshot(&self) -> Vec<Job> {
        self.store.snapshot()
    }

    /// Copy of one job record
    pub fn job(&self, id: JobId) -> Option<Job> {
        self.store.get(id)
    }

    pub fn summary(&self) -> BatchSummary {
        self.store.summary()
    }

    /// Serializable progress view for the UI layer
    pub fn report(&self) -> BatchReport {
        BatchReport::new(self.batch_id, self.store.snapshot())
    }

    /// Progress receiver, updated after every status change
    pub fn subscribe(&self) -> watch::Receiver<BatchSummary> {
        self.store.subscribe()
    }

    /// Waits until every job is `Done`, `Error` or `Cancelled`
    ///
    /// Also waits for retries that are in flight when it is called.
    pub async fn wait_for_completion(&self) -> BatchSummary {
        let mut progress = self.store.subscribe();
        match progress.wait_for(BatchSummary::is_complete).await {
            Ok(summary) => *summary,
            // The store owns the sender and outlives this call
            Err(_) => self.store.summary(),
        }
    }

    /// Stops dispatching and cancels every job that has not started
    ///
    /// Running jobs finish normally. Calling this more than once is harmless.
    pub fn cancel(&self) {
        let discarded = self.queue.cancel();

        let cancelled = self
            .store
            .ids()
            .into_iter()
            .filter(|&id| {
                self.store
                    .compare_and_set(id, JobStatus::Pending, Transition::Cancel)
            })
            .count();

        if cancelled > 0 || !discarded.is_empty() {
            info!(
                "Cancelled batch {}: {} pending job(s) cancelled, {} dequeued",
                self.batch_id,
                cancelled,
                discarded.len()
            );
        }
    }

    /// Runs one more attempt of a failed or cancelled job
    ///
    /// The attempt is dispatched immediately on its own task, outside the
    /// batch's worker pool and its concurrency cap. Use `wait_for_completion`
    /// or `subscribe` to observe the outcome.
    ///
    /// # Errors
    /// `BatchError::NotFound` for an unknown id, `BatchError::InvalidState` if
    /// the job is `Pending`, `Running` or `Done`.
    pub fn retry_job(&self, id: JobId) -> Result<()> {
        let status = self.store.status(id).ok_or(BatchError::NotFound(id))?;

        if !status.is_retriable() {
            return Err(BatchError::InvalidState { id, status });
        }

        if !self.store.compare_and_set(id, status, Transition::Start) {
            let status = self.store.status(id).ok_or(BatchError::NotFound(id))?;
            return Err(BatchError::InvalidState { id, status });
        }

        let attempt = self.store.get(id).map(|job| job.attempt).unwrap_or_default();
        info!("Retrying job {} of batch {} (attempt {})", id, self.batch_id, attempt);

        let store = Arc::clone(&self.store);
        let generator = Arc::clone(&self.generator);
        let mut retries = self.retries.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap settled retries so the set only tracks live ones
        while retries.try_join_next().is_some() {}
        retries.spawn(pool::execute_job(id, store, generator));

        Ok(())
    }

    /// Retries every job currently `Error` or `Cancelled`
    ///
    /// Returns the ids that were dispatched.
    pub fn retry_failed(&self) -> Vec<JobId> {
        let retried: Vec<JobId> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|job| job.status.is_retriable())
            .filter_map(|job| match self.retry_job(job.id) {
                Ok(()) => Some(job.id),
                Err(e) => {
                    debug!("Skipping retry of job {}: {}", job.id, e);
                    None
                }
            })
            .collect();

        info!("Regenerating {} job(s) of batch {}", retried.len(), self.batch_id);
        retried
    }

    /// Cancels pending work, then waits for workers and retries to finish
    pub async fn shutdown(mut self) -> BatchSummary {
        self.cancel();

        if let Some(pool) = self.pool.take() {
            pool.join().await;
        }

        let mut retries = std::mem::take(
            &mut *self.retries.lock().unwrap_or_else(PoisonError::into_inner),
        );
        while let Some(result) = retries.join_next().await {
            if let Err(e) = result {
                warn!("Retry task panicked: {}", e);
            }
        }

        self.store.summary()
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        self.cancel();

        if let Some(pool) = self.pool.take() {
            pool.detach();
        }
        self.retries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedGenerator, specs};
    use std::time::Duration;

    fn orchestrator(generator: &Arc<ScriptedGenerator>) -> Orchestrator {
        Orchestrator::new(generator.clone())
    }

    /// Samples the summary channel and returns the highest running count seen
    fn track_max_running(handle: &BatchHandle) -> tokio::task::JoinHandle<usize> {
        let mut progress = handle.subscribe();
        tokio::spawn(async move {
            let mut max_running = 0;
            loop {
                let summary = *progress.borrow_and_update();
                max_running = max_running.max(summary.running);
                if summary.is_complete() || progress.changed().await.is_err() {
                    break;
                }
            }
            max_running
        })
    }

    #[tokio::test]
    async fn test_rejects_empty_specs() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let err = orchestrator(&generator).start_batch(Vec::new(), 2).err().unwrap();
        assert!(matches!(err, BatchError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_rejects_zero_concurrency() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let err = orchestrator(&generator).start_batch(specs(3), 0).err().unwrap();
        assert!(matches!(err, BatchError::Configuration(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_worker_count_is_capped_by_job_count() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let batch = orchestrator(&generator).start_batch(specs(2), 8).unwrap();
        assert_eq!(batch.worker_count(), 2);
        batch.wait_for_completion().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_succeed_within_concurrency_cap() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(15)));
        let batch = orchestrator(&generator).start_batch(specs(15), 3).unwrap();
        let max_running = track_max_running(&batch);

        let summary = batch.wait_for_completion().await;

        assert_eq!(summary.total, 15);
        assert_eq!(summary.done, 15);
        assert_eq!(summary.error, 0);
        assert!(generator.max_in_flight() <= 3);
        assert!(max_running.await.unwrap() <= 3);
        assert!(batch.snapshot().iter().all(|job| job.attempt == 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_failure_then_retry() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(5)).failing("v3"));
        let batch = orchestrator(&generator).start_batch(specs(5), 2).unwrap();

        let summary = batch.wait_for_completion().await;
        assert_eq!(summary.done, 4);
        assert_eq!(summary.error, 1);

        let failed = batch.job(JobId(3)).unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert_eq!(failed.attempt, 1);
        assert!(failed.error_message.is_some());

        generator.recover("v3");
        batch.retry_job(JobId(3)).unwrap();
        let summary = batch.wait_for_completion().await;

        let retried = batch.job(JobId(3)).unwrap();
        assert_eq!(retried.status, JobStatus::Done);
        assert_eq!(retried.attempt, 2);
        assert!(retried.error_message.is_none());
        assert_eq!(summary.done, 5);
    }

    #[tokio::test]
    async fn test_retry_that_fails_again_settles_to_error() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(1)).failing("v1"));
        let batch = orchestrator(&generator).start_batch(specs(1), 1).unwrap();
        batch.wait_for_completion().await;

        batch.retry_job(JobId(1)).unwrap();
        batch.wait_for_completion().await;

        let job = batch.job(JobId(1)).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.attempt, 2);
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(5)));
        let batch = orchestrator(&generator).start_batch(specs(10), 1).unwrap();
        batch.cancel();

        let summary = batch.wait_for_completion().await;
        assert_eq!(summary.total, 10);
        // No worker has been polled yet on this single-threaded runtime
        assert_eq!(summary.cancelled, 10);
        assert_eq!(summary.done, 0);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_lets_running_jobs_finish() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(50)));
        let batch = orchestrator(&generator).start_batch(specs(6), 2).unwrap();

        let mut progress = batch.subscribe();
        progress.wait_for(|s| s.running == 2).await.unwrap();
        batch.cancel();
        batch.cancel();

        let summary = batch.wait_for_completion().await;
        assert_eq!(summary.done, 2);
        assert_eq!(summary.cancelled, 4);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_rejects_unknown_and_invalid_jobs() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(1)));
        let batch = orchestrator(&generator).start_batch(specs(2), 1).unwrap();
        batch.wait_for_completion().await;

        let err = batch.retry_job(JobId(42)).unwrap_err();
        assert!(err.is_not_found());

        let before = batch.job(JobId(1)).unwrap();
        let err = batch.retry_job(JobId(1)).unwrap_err();
        assert!(matches!(
            err,
            BatchError::InvalidState {
                status: JobStatus::Done,
                ..
            }
        ));

        let after = batch.job(JobId(1)).unwrap();
        assert_eq!(after.status, JobStatus::Done);
        assert_eq!(after.attempt, before.attempt);
        assert_eq!(after.result, before.result);
    }

    #[tokio::test]
    async fn test_retry_rejects_pending_job() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(1)));
        let batch = orchestrator(&generator).start_batch(specs(2), 1).unwrap();

        // Workers have not been polled yet on this single-threaded runtime
        let err = batch.retry_job(JobId(2)).unwrap_err();
        assert!(matches!(
            err,
            BatchError::InvalidState {
                status: JobStatus::Pending,
                ..
            }
        ));

        batch.wait_for_completion().await;
        assert_eq!(batch.job(JobId(2)).unwrap().attempt, 1);
    }

    #[tokio::test]
    async fn test_retry_rejects_running_job() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(100)));
        let batch = orchestrator(&generator).start_batch(specs(1), 1).unwrap();

        let mut progress = batch.subscribe();
        progress.wait_for(|s| s.running == 1).await.unwrap();

        let err = batch.retry_job(JobId(1)).unwrap_err();
        assert!(err.is_invalid_state());
        batch.wait_for_completion().await;
    }

    #[tokio::test]
    async fn test_cancelled_job_can_be_retried() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(1)));
        let batch = orchestrator(&generator).start_batch(specs(3), 1).unwrap();
        batch.cancel();
        batch.wait_for_completion().await;

        let cancelled: Vec<JobId> = batch
            .snapshot()
            .into_iter()
            .filter(|job| job.status == JobStatus::Cancelled)
            .map(|job| job.id)
            .collect();
        assert!(!cancelled.is_empty());

        let retried = batch.retry_failed();
        assert_eq!(retried, cancelled);

        let summary = batch.wait_for_completion().await;
        assert_eq!(summary.done, 3);
        for id in retried {
            assert_eq!(batch.job(id).unwrap().attempt, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_retry_failed_regenerates_every_error() {
        let generator = Arc::new(
            ScriptedGenerator::new(Duration::from_millis(2))
                .failing("v2")
                .failing("v4"),
        );
        let batch = orchestrator(&generator).start_batch(specs(4), 4).unwrap();
        assert_eq!(batch.wait_for_completion().await.error, 2);

        generator.recover("v2");
        assert_eq!(batch.retry_failed(), vec![JobId(2), JobId(4)]);

        let summary = batch.wait_for_completion().await;
        assert_eq!(summary.done, 3);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.settled(), summary.total);
    }

    #[tokio::test]
    async fn test_shutdown_joins_workers() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(5)));
        let batch = orchestrator(&generator).start_batch(specs(4), 2).unwrap();

        let summary = batch.shutdown().await;
        assert!(summary.is_complete());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.settled(), 4);
    }

    #[tokio::test]
    async fn test_abandoned_shutdown_still_settles_running_job() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(100)));
        let batch = orchestrator(&generator).start_batch(specs(3), 1).unwrap();

        let mut progress = batch.subscribe();
        progress.wait_for(|s| s.running == 1).await.unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(5), batch.shutdown()).await;
        assert!(abandoned.is_err());

        let summary = *tokio::time::timeout(
            Duration::from_secs(2),
            progress.wait_for(BatchSummary::is_complete),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(summary.done, 1);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels_pending_and_settles_running() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(50)));
        let batch = orchestrator(&generator).start_batch(specs(3), 1).unwrap();

        let mut progress = batch.subscribe();
        progress.wait_for(|s| s.running == 1).await.unwrap();
        drop(batch);

        let summary = *tokio::time::timeout(
            Duration::from_secs(2),
            progress.wait_for(BatchSummary::is_complete),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(summary.done, 1);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.running, 0);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_report_reflects_snapshot() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(1)));
        let batch = orchestrator(&generator).start_batch(specs(3), 3).unwrap();
        batch.wait_for_completion().await;

        let report = batch.report();
        assert_eq!(report.batch_id, batch.id());
        assert_eq!(report.summary.done, 3);
        assert_eq!(report.jobs.len(), 3);
        assert_eq!(report.jobs[0].result.as_ref().unwrap().uri, "mem://v1");
    }
}
