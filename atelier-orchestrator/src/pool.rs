//! Worker pool
//!
//! A fixed set of workers drains the job queue into the generator. Each
//! worker claims a job by moving it `Pending -> Running` in the status store;
//! a job that was cancelled in the meantime is skipped. A failing or panicking
//! generator call only settles its own job to `Error`.

use atelier_core::Generator;
use atelier_core::domain::job::{JobId, JobStatus};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::queue::JobQueue;
use crate::store::{StatusStore, Transition};

/// Fixed-size set of workers for one batch
pub struct WorkerPool {
    tasks: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Spawns `size` workers onto the current Tokio runtime
    ///
    /// Workers exit on their own once `queue` is closed and drained.
    pub fn spawn(
        size: usize,
        queue: Arc<JobQueue>,
        store: Arc<StatusStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let mut tasks = JoinSet::new();

        for worker_id in 0..size {
            tasks.spawn(run_worker(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&store),
                Arc::clone(&generator),
            ));
        }

        debug!("Spawned {} worker(s)", size);

        Self { tasks, size }
    }

    /// Number of workers the pool was started with
    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for every worker to exit
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!("Worker task panicked: {}", e);
            }
        }
    }

    /// Lets the workers finish in the background without a handle
    pub fn detach(mut self) {
        self.tasks.detach_all();
    }
}

/// Worker loop: pop, claim, generate, settle
async fn run_worker(
    worker_id: usize,
    queue: Arc<JobQueue>,
    store: Arc<StatusStore>,
    generator: Arc<dyn Generator>,
) {
    let mut executed = 0usize;

    while let Some(id) = queue.pop().await {
        if !store.compare_and_set(id, JobStatus::Pending, Transition::Start) {
            debug!("Worker {} skipping job {} (no longer pending)", worker_id, id);
            continue;
        }

        debug!("Worker {} claimed job {}", worker_id, id);
        execute_job(id, Arc::clone(&store), Arc::clone(&generator)).await;
        executed += 1;
    }

    debug!("Worker {} exiting after {} job(s)", worker_id, executed);
}

/// Runs one generator attempt for a job already moved to `Running`
///
/// Shared by pool workers and explicit retries. The attempt is settled on its
/// own task, so aborting the caller (a worker torn down mid-call, say) never
/// leaves the job stuck in `Running`.
pub(crate) async fn execute_job(
    id: JobId,
    store: Arc<StatusStore>,
    generator: Arc<dyn Generator>,
) {
    let settle = tokio::spawn(settle_job(id, store, generator));
    if let Err(e) = settle.await {
        warn!("Settling job {} failed: {}", id, e);
    }
}

/// Calls the generator and records the outcome
///
/// The generator call runs in a nested task so a panic is recorded as a job
/// failure.
async fn settle_job(id: JobId, store: Arc<StatusStore>, generator: Arc<dyn Generator>) {
    let Some(job) = store.get(id) else {
        warn!("Job {} vanished before execution", id);
        return;
    };

    let spec = job.spec;
    let outcome = tokio::spawn(async move { generator.generate(&spec).await }).await;

    let transition = match outcome {
        Ok(Ok(image)) => {
            info!("Job {} (attempt {}) generated {}", id, job.attempt, image);
            Transition::Complete(image)
        }
        Ok(Err(e)) => {
            warn!("Job {} (attempt {}) failed: {:#}", id, job.attempt, e);
            Transition::Fail(format!("{:#}", e))
        }
        Err(e) => {
            error!("Generator task for job {} panicked: {}", id, e);
            Transition::Fail(format!("Generator task failed: {}", e))
        }
    };

    if !store.compare_and_set(id, JobStatus::Running, transition) {
        warn!("Job {} left Running before its result was recorded", id);
    }
}
