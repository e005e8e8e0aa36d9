//! Atelier Orchestrator
//!
//! Fans a user's selection out into independent calls to the image generator,
//! bounded by a concurrency cap, with per-job status tracking and explicit retry.
//!
//! Architecture:
//! - Queue: FIFO of not-yet-dispatched job ids with blocking pop and close
//! - Store: The single authoritative map of job statuses, mutated only by compare-and-set
//! - Pool: A fixed set of workers draining the queue into the generator
//! - Orchestrator: Starts batches and hands out a `BatchHandle` for progress,
//!   cancellation and retry
//!
//! # Example
//!
//! ```no_run
//! use atelier_core::domain::selection::Selection;
//! use atelier_core::domain::variant::{ImageRef, VariantSpec};
//! use atelier_core::Generator;
//! use atelier_orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl Generator for Echo {
//!     async fn generate(&self, spec: &VariantSpec) -> anyhow::Result<ImageRef> {
//!         Ok(ImageRef::new(format!("mem://{}", spec.label)))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::new(Arc::new(Echo));
//!     let specs = Selection::new("camera_angle")
//!         .with_values(["front", "back", "left"])
//!         .into_specs();
//!
//!     let batch = orchestrator.start_batch(specs, 2)?;
//!     let summary = batch.wait_for_completion().await;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod error;
mod orchestrator;
mod pool;
mod queue;
mod store;

pub use error::{BatchError, QueueClosed, Result};
pub use orchestrator::{BatchHandle, Orchestrator};
pub use pool::WorkerPool;
pub use queue::JobQueue;
pub use store::{StatusStore, Transition};

#[cfg(test)]
mod testing;
