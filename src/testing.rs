//! Scripted in-memory model backend for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    error::{PoseGenError, Result},
    gemini::ModelBackend,
    models::{GenerateContentRequest, GenerateContentResponse, Part},
};

pub(crate) enum IdeaReply {
    Text(String),
    Error,
    NoText,
}

pub(crate) struct ScriptedBackend {
    idea_reply: IdeaReply,
    failing: Vec<String>,
    imageless: Vec<String>,
    delays_ms: HashMap<String, u64>,
    pub idea_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub idea_requests: Mutex<Vec<(String, GenerateContentRequest)>>,
    pub image_requests: Mutex<Vec<(String, GenerateContentRequest)>>,
}

impl ScriptedBackend {
    fn with_reply(idea_reply: IdeaReply) -> Self {
        Self {
            idea_reply,
            failing: Vec::new(),
            imageless: Vec::new(),
            delays_ms: HashMap::new(),
            idea_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            idea_requests: Mutex::new(Vec::new()),
            image_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ideas(ideas: &[&str]) -> Self {
        let body = serde_json::to_string(ideas).unwrap();
        Self::with_reply(IdeaReply::Text(body))
    }

    pub fn with_idea_text(text: &str) -> Self {
        Self::with_reply(IdeaReply::Text(text.to_string()))
    }

    pub fn failing_ideation() -> Self {
        Self::with_reply(IdeaReply::Error)
    }

    pub fn without_idea_text() -> Self {
        Self::with_reply(IdeaReply::NoText)
    }

    pub fn fail_pose(mut self, pose: &str) -> Self {
        self.failing.push(pose.to_string());
        self
    }

    pub fn no_image_for(mut self, pose: &str) -> Self {
        self.imageless.push(pose.to_string());
        self
    }

    pub fn delay_pose(mut self, pose: &str, ms: u64) -> Self {
        self.delays_ms.insert(pose.to_string(), ms);
        self
    }

    pub fn idea_calls(&self) -> usize {
        self.idea_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn is_idea_request(request: &GenerateContentRequest) -> bool {
        request
            .generation_config
            .as_ref()
            .and_then(|config| config.response_mime_type.as_deref())
            == Some("application/json")
    }

    fn pose_of(request: &GenerateContentRequest) -> String {
        let prompt = request.prompt_text();
        prompt
            .split("following pose: '")
            .nth(1)
            .and_then(|rest| rest.split("'. The background").next())
            .unwrap_or_default()
            .to_string()
    }

    async fn image_reply(&self, pose: &str) -> Result<GenerateContentResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays_ms.get(pose).copied().unwrap_or(1);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|p| p == pose) {
            return Err(PoseGenError::RequestError("connection reset by peer".into()));
        }
        if self.imageless.iter().any(|p| p == pose) {
            return Ok(GenerateContentResponse::from_parts(vec![Part::text(
                "I can't help with that.",
            )]));
        }
        Ok(GenerateContentResponse::from_parts(vec![
            Part::text("Here is your image."),
            Part::inline("image/png", STANDARD.encode(pose.as_bytes())),
        ]))
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        if Self::is_idea_request(request) {
            self.idea_calls.fetch_add(1, Ordering::SeqCst);
            self.idea_requests
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));
            return match &self.idea_reply {
                IdeaReply::Text(text) => {
                    Ok(GenerateContentResponse::from_parts(vec![Part::text(text.clone())]))
                }
                IdeaReply::Error => Err(PoseGenError::ApiError {
                    status: 503,
                    message: "model overloaded".into(),
                }),
                IdeaReply::NoText => Ok(GenerateContentResponse::default()),
            };
        }

        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image_requests
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
        let pose = Self::pose_of(request);
        self.image_reply(&pose).await
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
