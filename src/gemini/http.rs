use std::time::Duration;

use crate::{
    config::GeminiConfig,
    error::{PoseGenError, Result},
    gemini::backend::ModelBackend,
    models::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
};
use async_trait::async_trait;
use reqwest::{header, Client};

/// HTTPS transport to `generativelanguage.googleapis.com`.
#[derive(Clone)]
pub struct GeminiHttpBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiHttpBackend {
    /// Fails when no API key is configured, so a client without credentials
    /// can never be constructed.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| PoseGenError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        let key = header::HeaderValue::from_str(&self.api_key)
            .map_err(|e| PoseGenError::ConfigError(format!("API key is not a valid header value: {}", e)))?;
        headers.insert("x-goog-api-key", key);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }
}

/// Maps a non-2xx reply to `ApiError`, preferring the message from Google's
/// error envelope and falling back to the raw body.
fn api_error(status: reqwest::StatusCode, body: String) -> PoseGenError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    PoseGenError::ApiError {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ModelBackend for GeminiHttpBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let part_count: usize = request.contents.iter().map(|c| c.parts.len()).sum();
        log::debug!("POST {} ({} content parts)", self.endpoint(model), part_count);

        let response = self
            .client
            .post(self.endpoint(model))
            .headers(self.build_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request to {} failed: {:?}", model, e);
                PoseGenError::RequestError(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PoseGenError::ResponseError(e.to_string()))?;

        if !status.is_success() {
            let err = api_error(status, body);
            log::error!("Gemini service error for {}: {}", model, err);
            return Err(err);
        }

        log::debug!("Gemini response from {}: {} bytes", model, body.len());

        serde_json::from_str(&body).map_err(|e| PoseGenError::ResponseError(e.to_string()))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
