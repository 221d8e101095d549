//! Sequences pose ideation and the per-idea image fan-out for one run.
//!
//! A run moves `Idle -> Ideating -> ImageFanOut -> Completed`, or drops to
//! `Failed` if ideation does not produce at least one idea. Once the fan-out
//! starts the run always completes; individual image failures only lower the
//! delivered count.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    config::{Config, OrchestratorConfig},
    error::{PoseGenError, Result},
    gemini::GeminiClient,
    logger::RunTimer,
    models::{
        GeneratedImage, GenerationEvent, GenerationRequest, ProgressState, RunState, RunSummary,
    },
};

/// Receives the progress of a run as it happens.
///
/// `on_image` is called in completion order, which is not idea order.
pub trait GenerationObserver: Send + Sync {
    fn on_progress(&self, progress: &ProgressState);

    fn on_image(&self, image: GeneratedImage);

    fn on_done(&self, _summary: &RunSummary) {}

    fn on_failed(&self, _error: &PoseGenError) {}
}

/// Forwards observer callbacks into a channel; backs [`Orchestrator::generate_poses_stream`].
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<GenerationEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<GenerationEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: GenerationEvent) {
        // A dropped receiver means the caller stopped listening; the run
        // itself keeps going.
        let _ = self.tx.send(event);
    }
}

impl GenerationObserver for ChannelObserver {
    fn on_progress(&self, progress: &ProgressState) {
        self.send(GenerationEvent::Progress(progress.clone()));
    }

    fn on_image(&self, image: GeneratedImage) {
        self.send(GenerationEvent::Image(image));
    }

    fn on_done(&self, summary: &RunSummary) {
        self.send(GenerationEvent::Done(summary.clone()));
    }

    fn on_failed(&self, error: &PoseGenError) {
        self.send(GenerationEvent::Failed(error.user_message()));
    }
}

struct StateTracker {
    state: RunState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        log::debug!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    client: GeminiClient,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(client: GeminiClient, config: OrchestratorConfig) -> Self {
        Self { client, config }
    }

    /// Builds the HTTP-backed orchestrator. Fails at construction when the
    /// API key is missing, never per request.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = GeminiClient::new(&config.gemini)?;
        Ok(Self::new(client, config.orchestrator.clone()))
    }

    pub async fn generate_poses(
        &self,
        request: &GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> Result<RunSummary> {
        let timer = RunTimer::new("pose generation");
        let mut tracker = StateTracker::new();

        match self.drive(request, observer, &mut tracker, &timer).await {
            Ok(summary) => {
                tracker.advance(RunState::Completed);
                if summary.delivered < summary.requested {
                    log::info!(
                        "Delivered {} of {} requested poses ({} ideas, {} dropped)",
                        summary.delivered,
                        summary.requested,
                        summary.ideas,
                        summary.dropped()
                    );
                }
                observer.on_done(&summary);
                Ok(summary)
            }
            Err(e) => {
                tracker.advance(RunState::Failed);
                log::error!("Pose generation failed: {}", e);
                observer.on_failed(&e);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        request: &GenerationRequest,
        observer: &dyn GenerationObserver,
        tracker: &mut StateTracker,
        timer: &RunTimer,
    ) -> Result<RunSummary> {
        tracker.advance(RunState::Ideating);
        observer.on_progress(&ProgressState::ideating());
        log::info!(
            "Requesting {} pose ideas from {}",
            request.pose_count,
            self.client.ideas().model()
        );

        let ideas = self
            .client
            .ideas()
            .get_pose_ideas(&request.theme, request.pose_count)
            .await?;

        if ideas.is_empty() {
            return Err(PoseGenError::EmptyIdeation);
        }

        let total = ideas.len();
        tracker.advance(RunState::ImageFanOut);
        observer.on_progress(&ProgressState::ideas_ready(total));

        let limit = self.config.max_concurrency.unwrap_or(total).clamp(1, total);
        log::info!(
            "Generating {} images with {} via {} ({} at a time)",
            total,
            self.client.images().model(),
            self.client.backend_name(),
            limit
        );

        let images = self.client.images();
        let source = &request.source;
        let theme = request.theme.as_str();
        let aspect_ratio = request.aspect_ratio;

        let mut pending = stream::iter(ideas)
            .map(move |idea| async move {
                images
                    .generate_single_pose(source, &idea, theme, aspect_ratio)
                    .await
            })
            .buffer_unordered(limit);

        let mut completed = 0;
        let mut delivered = 0;
        while let Some(result) = pending.next().await {
            completed += 1;
            observer.on_progress(&ProgressState::fan_out(completed, total));
            if let Some(image) = result {
                delivered += 1;
                observer.on_image(image);
            }
        }

        Ok(RunSummary {
            requested: request.pose_count,
            ideas: total,
            delivered,
            elapsed_ms: timer.elapsed().as_millis() as u64,
        })
    }

    /// Runs the generation on a background task and yields its events.
    ///
    /// The stream ends after a `Done` or `Failed` event. Dropping it early
    /// does not cancel requests already in flight.
    pub fn generate_poses_stream(
        &self,
        request: GenerationRequest,
    ) -> Pin<Box<dyn Stream<Item = GenerationEvent> + Send>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let observer = ChannelObserver::new(tx);
            let _ = orchestrator.generate_poses(&request, &observer).await;
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;
    use crate::models::{AspectRatio, SourceImage};
    use crate::testing::ScriptedBackend;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<ProgressState>>,
        images: Mutex<Vec<GeneratedImage>>,
        done: Mutex<Option<RunSummary>>,
        failed: Mutex<Option<String>>,
    }

    impl GenerationObserver for Recorder {
        fn on_progress(&self, progress: &ProgressState) {
            self.progress.lock().unwrap().push(progress.clone());
        }

        fn on_image(&self, image: GeneratedImage) {
            self.images.lock().unwrap().push(image);
        }

        fn on_done(&self, summary: &RunSummary) {
            *self.done.lock().unwrap() = Some(summary.clone());
        }

        fn on_failed(&self, error: &PoseGenError) {
            *self.failed.lock().unwrap() = Some(error.user_message());
        }
    }

    impl Recorder {
        fn last_message(&self) -> String {
            self.progress.lock().unwrap().last().unwrap().message.clone()
        }

        fn image_count(&self) -> usize {
            self.images.lock().unwrap().len()
        }
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> Orchestrator {
        Orchestrator::new(
            GeminiClient::with_backend(backend, &GeminiConfig::new()),
            OrchestratorConfig::new(),
        )
    }

    fn request(count: usize) -> GenerationRequest {
        GenerationRequest::new(
            SourceImage::from_bytes(b"portrait", "image/png"),
            "posing in a futuristic city",
        )
        .with_pose_count(count)
    }

    const NINE: [&str; 9] = [
        "arms crossed",
        "hands on hips",
        "leaning back",
        "walking forward",
        "looking over shoulder",
        "sitting on a ledge",
        "pointing at the sky",
        "hands in pockets",
        "mid-jump",
    ];

    #[tokio::test]
    async fn test_all_images_delivered() {
        let backend = Arc::new(ScriptedBackend::with_ideas(&NINE));
        let recorder = Recorder::default();

        let summary = orchestrator(backend.clone())
            .generate_poses(&request(9), &recorder)
            .await
            .unwrap();

        assert_eq!(summary.ideas, 9);
        assert_eq!(summary.delivered, 9);
        assert_eq!(recorder.image_count(), 9);
        assert_eq!(recorder.last_message(), "Generating images... (9/9)");
        assert_eq!(backend.image_calls(), 9);
        assert!(recorder.done.lock().unwrap().is_some());
        assert!(recorder.failed.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_progress_sequence_is_monotonic() {
        let backend = Arc::new(
            ScriptedBackend::with_ideas(&NINE)
                .delay_pose("arms crossed", 40)
                .delay_pose("mid-jump", 20)
                .fail_pose("leaning back"),
        );
        let recorder = Recorder::default();

        orchestrator(backend)
            .generate_poses(&request(9), &recorder)
            .await
            .unwrap();

        let progress = recorder.progress.lock().unwrap();
        assert_eq!(progress[0].message, "Generating creative pose ideas...");
        assert_eq!(progress[1].message, "Got 9 ideas! Now generating images...");

        let fan_out: Vec<usize> = progress[2..].iter().map(|p| p.completed).collect();
        assert_eq!(fan_out, (1..=9).collect::<Vec<_>>());
        assert!(progress[2..].iter().all(|p| p.total == 9));
    }

    #[tokio::test]
    async fn test_delivery_follows_completion_order() {
        let backend = Arc::new(
            ScriptedBackend::with_ideas(&["slow", "fast"])
                .delay_pose("slow", 50)
                .delay_pose("fast", 1),
        );
        let recorder = Recorder::default();

        orchestrator(backend)
            .generate_poses(&request(2), &recorder)
            .await
            .unwrap();

        let poses: Vec<String> = recorder
            .images
            .lock()
            .unwrap()
            .iter()
            .map(|image| image.pose.clone())
            .collect();
        assert_eq!(poses, vec!["fast", "slow"]);
    }

    #[tokio::test]
    async fn test_one_network_failure_is_absorbed() {
        let backend = Arc::new(ScriptedBackend::with_ideas(&NINE).fail_pose("hands on hips"));
        let recorder = Recorder::default();

        let summary = orchestrator(backend)
            .generate_poses(&request(9), &recorder)
            .await
            .unwrap();

        assert_eq!(summary.delivered, 8);
        assert_eq!(summary.dropped(), 1);
        assert_eq!(recorder.image_count(), 8);
        assert_eq!(recorder.last_message(), "Generating images... (9/9)");
        assert!(recorder.failed.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_every_image_failing_still_completes() {
        let backend = Arc::new(
            ScriptedBackend::with_ideas(&["a", "b"])
                .fail_pose("a")
                .no_image_for("b"),
        );
        let recorder = Recorder::default();

        let summary = orchestrator(backend)
            .generate_poses(&request(2), &recorder)
            .await
            .unwrap();

        assert_eq!(summary.delivered, 0);
        assert_eq!(recorder.image_count(), 0);
        assert_eq!(recorder.last_message(), "Generating images... (2/2)");
    }

    #[tokio::test]
    async fn test_model_under_delivers_ideas() {
        let backend = Arc::new(ScriptedBackend::with_ideas(&["jumping", "sitting"]));
        let recorder = Recorder::default();

        let summary = orchestrator(backend.clone())
            .generate_poses(&request(3), &recorder)
            .await
            .unwrap();

        assert_eq!(summary.requested, 3);
        assert_eq!(summary.ideas, 2);
        assert!(summary.delivered <= 2);
        assert_eq!(backend.image_calls(), 2);
        assert_eq!(recorder.last_message(), "Generating images... (2/2)");
    }

    #[tokio::test]
    async fn test_unparseable_ideas_fail_before_any_image_call() {
        let backend = Arc::new(ScriptedBackend::with_idea_text("not json"));
        let recorder = Recorder::default();

        let err = orchestrator(backend.clone())
            .generate_poses(&request(9), &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, PoseGenError::IdeationFailed(_)));
        assert_eq!(backend.image_calls(), 0);
        assert_eq!(recorder.image_count(), 0);
        assert_eq!(
            recorder.failed.lock().unwrap().as_deref(),
            Some(crate::error::IDEATION_FAILED_MESSAGE)
        );
        assert!(recorder.done.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_ideas_fail_run() {
        let backend = Arc::new(ScriptedBackend::with_idea_text("[]"));
        let recorder = Recorder::default();

        let err = orchestrator(backend.clone())
            .generate_poses(&request(3), &recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, PoseGenError::EmptyIdeation));
        assert_eq!(err.user_message(), "Failed to generate any pose ideas.");
        assert_eq!(backend.image_calls(), 0);
        assert_eq!(recorder.image_count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_is_concurrent_by_default() {
        let backend = Arc::new(
            ScriptedBackend::with_ideas(&["a", "b", "c", "d"])
                .delay_pose("a", 30)
                .delay_pose("b", 30)
                .delay_pose("c", 30)
                .delay_pose("d", 30),
        );
        let recorder = Recorder::default();

        orchestrator(backend.clone())
            .generate_poses(&request(4), &recorder)
            .await
            .unwrap();

        assert_eq!(backend.max_in_flight(), 4);
    }

    #[tokio::test]
    async fn test_concurrency_cap_is_respected() {
        let backend = Arc::new(
            ScriptedBackend::with_ideas(&["a", "b", "c", "d"])
                .delay_pose("a", 20)
                .delay_pose("b", 20)
                .delay_pose("c", 20)
                .delay_pose("d", 20),
        );
        let recorder = Recorder::default();
        let orchestrator = Orchestrator::new(
            GeminiClient::with_backend(backend.clone(), &GeminiConfig::new()),
            OrchestratorConfig::new().with_max_concurrency(2),
        );

        let summary = orchestrator.generate_poses(&request(4), &recorder).await.unwrap();

        assert_eq!(summary.delivered, 4);
        assert!(backend.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_image_requests_carry_aspect_ratio_and_source() {
        let backend = Arc::new(ScriptedBackend::with_ideas(&["waving"]));
        let recorder = Recorder::default();

        orchestrator(backend.clone())
            .generate_poses(
                &request(1).with_aspect_ratio(AspectRatio::Landscape),
                &recorder,
            )
            .await
            .unwrap();

        let requests = backend.image_requests.lock().unwrap();
        let prompt = requests[0].1.prompt_text();
        assert!(prompt.contains("16:9 aspect ratio"));
        assert!(prompt.contains("posing in a futuristic city"));
        let inline = requests[0].1.contents[0].parts[0].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_stream_yields_events_then_done() {
        let backend = Arc::new(ScriptedBackend::with_ideas(&["a", "b", "c"]).fail_pose("b"));
        let events: Vec<GenerationEvent> = orchestrator(backend)
            .generate_poses_stream(request(3))
            .collect()
            .await;

        let images = events
            .iter()
            .filter(|e| matches!(e, GenerationEvent::Image(_)))
            .count();
        assert_eq!(images, 2);
        match events.last() {
            Some(GenerationEvent::Done(summary)) => assert_eq!(summary.delivered, 2),
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_reports_failure() {
        let backend = Arc::new(ScriptedBackend::failing_ideation());
        let events: Vec<GenerationEvent> = orchestrator(backend)
            .generate_poses_stream(request(3))
            .collect()
            .await;

        match events.last() {
            Some(GenerationEvent::Failed(message)) => {
                assert!(message.starts_with("Could not generate pose ideas."))
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(!events.iter().any(|e| matches!(e, GenerationEvent::Image(_))));
    }
}
