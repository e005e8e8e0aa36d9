//! Generator wire DTOs

use serde::{Deserialize, Serialize};

use crate::domain::variant::{ImageRef, VariantSpec};

/// Request sent to an HTTP image generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub spec: VariantSpec,
}

/// Response returned by an HTTP image generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub image: ImageRef,
}
