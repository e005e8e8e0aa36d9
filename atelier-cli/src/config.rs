//! Configuration module
//!
//! Handles CLI configuration: where the image generator lives, how long a
//! single generation may take, and how many variants render at once.

use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the image generation service; the simulated generator is used when unset
    pub generator_url: Option<String>,

    /// Maximum number of variants generating at the same time
    pub concurrency: usize,

    /// Maximum time a single generation request may take
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator_url: None,
            concurrency: 3,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be greater than 0");
        }

        if let Some(url) = &self.generator_url {
            if url.is_empty() {
                anyhow::bail!("generator_url cannot be empty");
            }

            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("generator_url must start with http:// or https://");
            }
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}
