use thiserror::Error;

pub const IDEATION_FAILED_MESSAGE: &str =
    "Could not generate pose ideas. The model may be unavailable or the prompt may be inappropriate.";
pub const EMPTY_IDEATION_MESSAGE: &str = "Failed to generate any pose ideas.";
pub const PACKAGING_FAILED_MESSAGE: &str = "Could not create zip file for download.";

#[derive(Debug, Error)]
pub enum PoseGenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Gemini API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Pose ideation failed: {0}")]
    IdeationFailed(String),

    #[error("{}", EMPTY_IDEATION_MESSAGE)]
    EmptyIdeation,

    #[error("Archive packaging failed: {0}")]
    PackagingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PoseGenError {
    /// Short, non-technical message suitable for showing to the user.
    ///
    /// `Display` keeps the diagnostic detail and is what ends up in the logs.
    pub fn user_message(&self) -> String {
        match self {
            PoseGenError::IdeationFailed(_) => IDEATION_FAILED_MESSAGE.to_string(),
            PoseGenError::EmptyIdeation => EMPTY_IDEATION_MESSAGE.to_string(),
            PoseGenError::PackagingError(_) => PACKAGING_FAILED_MESSAGE.to_string(),
            PoseGenError::InvalidInput(msg) => msg.clone(),
            PoseGenError::ConfigError(msg) => msg.clone(),
            _ => "An unknown error occurred.".to_string(),
        }
    }
}

impl From<serde_json::Error> for PoseGenError {
    fn from(err: serde_json::Error) -> Self {
        PoseGenError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for PoseGenError {
    fn from(err: reqwest::Error) -> Self {
        PoseGenError::RequestError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PoseGenError>;
