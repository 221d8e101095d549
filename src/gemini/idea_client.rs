use std::sync::Arc;

use crate::{
    error::{PoseGenError, Result},
    gemini::backend::ModelBackend,
    models::{GenerateContentRequest, GenerationConfig, Part, PoseIdea},
};
use serde_json::json;

#[derive(Clone)]
pub struct IdeaClient {
    backend: Arc<dyn ModelBackend>,
    model: String,
}

impl IdeaClient {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(theme: &str, count: usize) -> GenerateContentRequest {
        let prompt = format!(
            "Based on the theme \"{}\", generate a JSON array of {} unique, simple, and distinct full-body pose descriptions for a person. Only return a valid JSON array of strings.",
            theme, count
        );

        GenerateContentRequest::new(vec![Part::text(prompt)]).with_config(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(json!({
                "type": "ARRAY",
                "items": {
                    "type": "STRING",
                    "description": "A description of a person's pose."
                }
            })),
            response_modalities: None,
        })
    }

    /// Asks the model for up to `count` pose descriptions for `theme`.
    ///
    /// Any failure collapses into [`PoseGenError::IdeationFailed`]; the cause is
    /// logged here and kept in the error for diagnostics.
    pub async fn get_pose_ideas(&self, theme: &str, count: usize) -> Result<Vec<PoseIdea>> {
        let request = Self::build_request(theme, count);

        log::info!("Requesting {} pose ideas from {}", count, self.model);

        let outcome = match self.backend.generate_content(&self.model, &request).await {
            Ok(response) => match response.text() {
                Some(text) => parse_pose_ideas(&text, count),
                None => Err(PoseGenError::ResponseError(
                    "response contained no text".into(),
                )),
            },
            Err(e) => Err(e),
        };

        outcome.map_err(|e| {
            log::error!("Error generating pose ideas: {}", e);
            match e {
                PoseGenError::IdeationFailed(_) => e,
                other => PoseGenError::IdeationFailed(other.to_string()),
            }
        })
    }
}

/// Parses a model reply that should be a JSON array of strings.
///
/// Mixed or nested arrays are rejected outright. Extra ideas beyond `count`
/// are dropped.
pub fn parse_pose_ideas(text: &str, count: usize) -> Result<Vec<PoseIdea>> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| PoseGenError::IdeationFailed(format!("response is not valid JSON: {}", e)))?;

    let items = value.as_array().ok_or_else(|| {
        PoseGenError::IdeationFailed("Invalid format for pose ideas: expected an array".into())
    })?;

    let mut ideas = items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                PoseGenError::IdeationFailed(format!(
                    "Invalid format for pose ideas: non-string element {}",
                    item
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if ideas.len() > count {
        log::debug!("Model returned {} ideas, keeping {}", ideas.len(), count);
        ideas.truncate(count);
    }

    Ok(ideas)
}
