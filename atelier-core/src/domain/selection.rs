//! Selection expansion
//!
//! A selection is what the user picked in the UI: a set of shared parameters
//! (prompt, product, style) and several values along one axis, such as camera
//! angles or pack shots. Each value becomes one variant spec.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::variant::VariantSpec;

/// User selection fanned out along a single axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    /// Parameters shared by every variant
    #[serde(default)]
    pub base: HashMap<String, serde_json::Value>,
    /// Parameter name the values are assigned to (e.g. "camera_angle")
    pub axis: String,
    /// Selected values, in the order they should be dispatched
    pub values: Vec<String>,
}

impl Selection {
    pub fn new(axis: impl Into<String>) -> Self {
        Self {
            base: HashMap::new(),
            axis: axis.into(),
            values: Vec::new(),
        }
    }

    /// Adds a shared parameter
    pub fn with_base(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.base.insert(key.into(), value.into());
        self
    }

    /// Appends selected values
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.extend(values.into_iter().map(Into::into));
        self
    }

    /// Expands the selection into one spec per distinct value
    ///
    /// Blank and repeated values are skipped; the first occurrence keeps its position.
    pub fn into_specs(self) -> Vec<VariantSpec> {
        let mut seen = std::collections::HashSet::new();
        let mut specs = Vec::with_capacity(self.values.len());

        for value in self.values {
            let value = value.trim().to_string();
            if value.is_empty() || !seen.insert(value.clone()) {
                continue;
            }

            let mut spec = VariantSpec::new(value.clone());
            spec.parameters = self.base.clone();
            spec.parameters
                .insert(self.axis.clone(), serde_json::Value::String(value));
            specs.push(spec);
        }

        specs
    }
}
