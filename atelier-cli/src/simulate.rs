//! Simulated image generator
//!
//! Stands in for a real generation service so batches can be exercised
//! offline. Every call sleeps for the configured latency; labels listed as
//! flaky fail on their first attempt and succeed when retried.

use anyhow::{Result, bail};
use async_trait::async_trait;
use atelier_core::Generator;
use atelier_core::domain::variant::{ImageRef, VariantSpec};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub struct SimulatedGenerator {
    latency: Duration,
    flaky: HashSet<String>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl SimulatedGenerator {
    pub fn new(latency: Duration, flaky: impl IntoIterator<Item = String>) -> Self {
        Self {
            latency,
            flaky: flaky.into_iter().collect(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn record_attempt(&self, label: &str) -> u32 {
        let mut attempts = self
            .attempts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let count = attempts.entry(label.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

#[async_trait]
impl Generator for SimulatedGenerator {
    async fn generate(&self, spec: &VariantSpec) -> Result<ImageRef> {
        let attempt = self.record_attempt(&spec.label);
        tokio::time::sleep(self.latency).await;

        if attempt == 1 && self.flaky.contains(&spec.label) {
            bail!("simulated upstream failure for '{}'", spec.label);
        }

        Ok(ImageRef::new(format!(
            "sim://{}/attempt-{}.png",
            spec.label, attempt
        )))
    }
}
