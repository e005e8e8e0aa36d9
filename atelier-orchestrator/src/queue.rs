//! Job queue
//!
//! FIFO buffer of job ids waiting for a worker. Any number of workers may pop
//! concurrently; `pop` parks until an id is available or the queue is closed
//! and drained, so idle workers never spin.

use atelier_core::domain::job::JobId;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::error::QueueClosed;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<JobId>,
    closed: bool,
}

/// FIFO of not-yet-dispatched job ids
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a job id to the tail
    ///
    /// Fails once the queue has been closed.
    pub fn push(&self, id: JobId) -> Result<(), QueueClosed> {
        {
            let mut state = self.state();
            if state.closed {
                return Err(QueueClosed(id));
            }
            state.items.push_back(id);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes the id at the head, waiting for one if the queue is empty
    ///
    /// Returns `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<JobId> {
        loop {
            // Register interest before checking so a push or close between the
            // check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if let Some(id) = state.items.pop_front() {
                    return Some(id);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Rejects further pushes; workers exit once the remaining ids are drained
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        self.state().closed = true;
        self.notify.notify_waiters();
    }

    /// Closes the queue and discards every id not yet popped
    ///
    /// Returns the discarded ids in queue order.
    pub fn cancel(&self) -> Vec<JobId> {
        let discarded = {
            let mut state = self.state();
            state.closed = true;
            state.items.drain(..).collect()
        };
        self.notify.notify_waiters();
        discarded
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}
