//! Pose variations of a portrait photo, generated with Google Gemini.
//!
//! A run asks the model for pose ideas on a theme, then generates one image
//! per idea concurrently, reporting progress as each finishes.

pub mod archive;
pub mod capture;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{Config, GeminiConfig, OrchestratorConfig};
pub use error::{PoseGenError, Result};
pub use gemini::{GeminiClient, GeminiHttpBackend, IdeaClient, ModelBackend, PoseImageClient};
pub use models::{
    AspectRatio, GeneratedImage, GenerationEvent, GenerationRequest, PoseIdea, ProgressState,
    RunState, RunSummary, SourceImage,
};
pub use orchestrator::{ChannelObserver, GenerationObserver, Orchestrator};
pub use session::GenerationSession;
