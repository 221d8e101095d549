pub mod backend;
pub mod http;
pub mod idea_client;
pub mod image_client;

use crate::{config::GeminiConfig, error::Result};
use std::sync::Arc;

pub use backend::ModelBackend;
pub use http::GeminiHttpBackend;
pub use idea_client::{parse_pose_ideas, IdeaClient};
pub use image_client::PoseImageClient;

#[derive(Clone)]
pub struct GeminiClient {
    idea_client: IdeaClient,
    image_client: PoseImageClient,
    backend: Arc<dyn ModelBackend>,
}

impl GeminiClient {
    /// Connects to the Gemini HTTP API. Errors if no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let backend = GeminiHttpBackend::new(config)?;
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    pub fn with_backend(backend: Arc<dyn ModelBackend>, config: &GeminiConfig) -> Self {
        Self {
            idea_client: IdeaClient::new(backend.clone(), config.idea_model.clone()),
            image_client: PoseImageClient::new(backend.clone(), config.image_model.clone()),
            backend,
        }
    }

    pub fn ideas(&self) -> &IdeaClient {
        &self.idea_client
    }

    pub fn images(&self) -> &PoseImageClient {
        &self.image_client
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}
