use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{PoseGenError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image_data: String, // Base64 encoded PNG
    pub pose: String,
}

impl GeneratedImage {
    pub fn new(image_data: impl Into<String>, pose: impl Into<String>) -> Self {
        Self {
            image_data: image_data.into(),
            pose: pose.into(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.image_data)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.image_data.trim())
            .map_err(|e| PoseGenError::ResponseError(format!("invalid base64 image data: {}", e)))
    }

    /// Download name for the image at `index` (zero-based) in delivery order.
    pub fn file_name(index: usize) -> String {
        format!("pose_{}.png", index + 1)
    }
}
