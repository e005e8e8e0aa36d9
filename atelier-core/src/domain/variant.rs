//! Variant spec and result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptor of one image variant to generate
///
/// Opaque to the orchestrator: only generator implementations interpret
/// the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub label: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl VariantSpec {
    /// Creates a spec with no parameters
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parameters: HashMap::new(),
        }
    }

    /// Adds or replaces a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Reference to a generated image (URL, storage key, data handle)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub uri: String,
}

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}
