//! Generators used by the orchestrator tests

use anyhow::{Result, bail};
use async_trait::async_trait;
use atelier_core::Generator;
use atelier_core::domain::variant::{ImageRef, VariantSpec};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Sleeps for `latency`, fails for labels in `failing`, and records how many
/// calls overlapped.
pub struct ScriptedGenerator {
    latency: Duration,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    panic_on: Option<String>,
}

impl ScriptedGenerator {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            panic_on: None,
        }
    }

    pub fn failing(self, label: &str) -> Self {
        self.failing.lock().unwrap().insert(label.to_string());
        self
    }

    pub fn panicking(mut self, label: &str) -> Self {
        self.panic_on = Some(label.to_string());
        self
    }

    /// Lets a previously failing label succeed from now on
    pub fn recover(&self, label: &str) {
        self.failing.lock().unwrap().remove(label);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, spec: &VariantSpec) -> Result<ImageRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.as_deref() == Some(spec.label.as_str()) {
            panic!("generator exploded on {}", spec.label);
        }
        if self.failing.lock().unwrap().contains(&spec.label) {
            bail!("upstream rejected {}", spec.label);
        }
        Ok(ImageRef::new(format!("mem://{}", spec.label)))
    }
}

/// Specs labelled `v1..=vN`, so `v3` is job `#3`
pub fn specs(n: usize) -> Vec<VariantSpec> {
    (1..=n).map(|i| VariantSpec::new(format!("v{}", i))).collect()
}
