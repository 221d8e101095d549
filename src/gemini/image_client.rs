use std::sync::Arc;

use crate::{
    gemini::backend::ModelBackend,
    models::{
        AspectRatio, GenerateContentRequest, GeneratedImage, GenerationConfig, Part, SourceImage,
    },
};

#[derive(Clone)]
pub struct PoseImageClient {
    backend: Arc<dyn ModelBackend>,
    model: String,
}

impl PoseImageClient {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_prompt(pose: &str, theme: &str, aspect_ratio: AspectRatio) -> String {
        format!(
            "{} Create a high-quality, photorealistic image of the person from the input photo. Their face must be clearly visible and very similar to the original. They are in the following pose: '{}'. The background is a scene based on the theme: '{}'.",
            aspect_ratio.instruction(),
            pose,
            theme
        )
    }

    pub fn build_request(
        source: &SourceImage,
        pose: &str,
        theme: &str,
        aspect_ratio: AspectRatio,
    ) -> GenerateContentRequest {
        GenerateContentRequest::new(vec![
            Part::inline(source.mime_type.clone(), source.data.clone()),
            Part::text(Self::build_prompt(pose, theme, aspect_ratio)),
        ])
        .with_config(GenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
            ..Default::default()
        })
    }

    /// Generates one image for `pose`. Never fails: transport errors, refusals
    /// and text-only replies all come back as `None` so a bad pose cannot take
    /// down its siblings.
    pub async fn generate_single_pose(
        &self,
        source: &SourceImage,
        pose: &str,
        theme: &str,
        aspect_ratio: AspectRatio,
    ) -> Option<GeneratedImage> {
        let request = Self::build_request(source, pose, theme, aspect_ratio);

        log::debug!("Generating {} image for pose \"{}\"", aspect_ratio, pose);

        let response = match self.backend.generate_content(&self.model, &request).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Error generating pose for prompt \"{}\": {}", pose, e);
                return None;
            }
        };

        match response.first_inline_image() {
            Some(inline) => {
                log::debug!(
                    "Received {} image for \"{}\" ({} base64 chars)",
                    inline.mime_type,
                    pose,
                    inline.data.len()
                );
                Some(GeneratedImage::new(inline.data.clone(), pose))
            }
            None => {
                log::warn!(
                    "No image part returned for pose \"{}\" (finish reason: {})",
                    pose,
                    response.finish_reason().unwrap_or("unknown")
                );
                None
            }
        }
    }
}
