use std::env;
use std::path::PathBuf;

use crate::error::{PoseGenError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IDEA_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_poses";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub idea_model: String,
    pub image_model: String,
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            idea_model: DEFAULT_IDEA_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            timeout_secs: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `API_KEY` wins over `GEMINI_API_KEY` when both are set.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = env::var("API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url);
        let idea_model = env::var("POSEGEN_IDEA_MODEL").unwrap_or(defaults.idea_model);
        let image_model = env::var("POSEGEN_IMAGE_MODEL").unwrap_or(defaults.image_model);
        let timeout_secs = env::var("POSEGEN_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());

        GeminiConfig {
            api_key,
            base_url,
            idea_model,
            image_model,
            timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models(
        mut self,
        idea_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        self.idea_model = idea_model.into();
        self.image_model = image_model.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PoseGenError::ConfigError("API_KEY environment variable is not set".into()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Upper bound on in-flight image requests. `None` launches one per idea.
    pub max_concurrency: Option<usize>,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let max_concurrency = env::var("POSEGEN_MAX_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|limit: &usize| *limit > 0);

        OrchestratorConfig { max_concurrency }
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub orchestrator: OrchestratorConfig,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gemini: GeminiConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let output_dir = env::var("POSEGEN_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Config {
            gemini: GeminiConfig::from_env(),
            orchestrator: OrchestratorConfig::from_env(),
            output_dir,
        }
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_orchestrator(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = config;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
