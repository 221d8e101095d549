use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::PoseGenError;

pub const DEFAULT_THEME: &str = "posing in a futuristic city";
pub const DEFAULT_POSE_COUNT: usize = 9;

/// A captured portrait, held as base64 text ready to be inlined into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: String,
    pub mime_type: String,
    pub name: Option<String>,
}

impl SourceImage {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            name: None,
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::new(STANDARD.encode(bytes), mime_type)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }

    /// Framing directive placed at the front of every image prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "CRITICAL: The generated image MUST have a 9:16 aspect ratio (vertical portrait). Re-frame the entire scene to fit this vertical format.",
            AspectRatio::Landscape => "CRITICAL: The generated image MUST have a 16:9 aspect ratio (horizontal landscape). Re-frame the entire scene to fit this widescreen format.",
            AspectRatio::Square => "CRITICAL: The generated image MUST have a 1:1 aspect ratio (a perfect square).",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = PoseGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1:1" | "square" => Ok(AspectRatio::Square),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            "16:9" | "landscape" => Ok(AspectRatio::Landscape),
            other => Err(PoseGenError::InvalidInput(format!(
                "Unsupported aspect ratio '{}'. Use 1:1, 9:16 or 16:9.",
                other
            ))),
        }
    }
}

/// One run's worth of input. Built fresh per run and dropped afterwards.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source: SourceImage,
    pub theme: String,
    pub aspect_ratio: AspectRatio,
    pub pose_count: usize,
}

impl GenerationRequest {
    pub fn new(source: SourceImage, theme: impl Into<String>) -> Self {
        Self {
            source,
            theme: theme.into(),
            aspect_ratio: AspectRatio::default(),
            pose_count: DEFAULT_POSE_COUNT,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_pose_count(mut self, pose_count: usize) -> Self {
        self.pose_count = pose_count;
        self
    }
}

pub type PoseIdea = String;
