//! Atelier Generator Client
//!
//! HTTP implementation of the `Generator` capability. Each call posts one
//! variant spec to the image generation service and returns the reference of
//! the produced image. No retry or backoff is applied here; call duration is
//! bounded by the HTTP client's timeout.
//!
//! # Example
//!
//! ```no_run
//! use atelier_client::GeneratorClient;
//! use atelier_core::domain::variant::VariantSpec;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GeneratorClient::new("http://localhost:8188");
//!
//!     let image = client
//!         .request_image(&VariantSpec::new("front").with_param("camera_angle", "front"))
//!         .await?;
//!
//!     println!("Generated: {}", image);
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ClientError, Result};

use anyhow::Context;
use async_trait::async_trait;
use atelier_core::Generator;
use atelier_core::domain::variant::{ImageRef, VariantSpec};
use atelier_core::dto::generate::{GenerateRequest, GenerateResponse};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Error body returned by the generation service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for an image generation service
#[derive(Debug, Clone)]
pub struct GeneratorClient {
    /// Base URL of the service (e.g., "http://localhost:8188")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl GeneratorClient {
    /// Create a new generator client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the generation service
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client whose calls give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a new generator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request one image for a variant spec
    ///
    /// # Arguments
    /// * `spec` - The variant to render
    ///
    /// # Returns
    /// The reference of the generated image
    pub async fn request_image(&self, spec: &VariantSpec) -> Result<ImageRef> {
        if spec.label.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "variant label cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest { spec: spec.clone() };

        debug!("Requesting image for variant '{}'", spec.label);
        let response = self.client.post(&url).json(&request).send().await?;
        let body: GenerateResponse = self.handle_response(response).await?;

        Ok(body.image)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Error bodies of the form `{"error": "..."}` are unwrapped to their message.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(
                status.as_u16(),
                error_message(&error_text),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Extracts the message of a JSON error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl Generator for GeneratorClient {
    async fn generate(&self, spec: &VariantSpec) -> anyhow::Result<ImageRef> {
        self.request_image(spec)
            .await
            .with_context(|| format!("Generating variant '{}'", spec.label))
    }
}
