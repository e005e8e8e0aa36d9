//! Generator capability
//!
//! The external image generator is slow and unreliable. The orchestrator calls
//! it exactly once per dispatch or explicit retry and never retries on its own;
//! bounding call duration is the implementation's job.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::variant::{ImageRef, VariantSpec};

/// Capability that turns a variant spec into an image
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generates one image
    ///
    /// # Arguments
    /// * `spec` - The variant to render
    ///
    /// # Returns
    /// A reference to the generated image, or the reason generation failed
    async fn generate(&self, spec: &VariantSpec) -> Result<ImageRef>;
}
