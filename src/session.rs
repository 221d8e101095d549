//! UI-side state for one user's generation session.
//!
//! The orchestrator keeps nothing between runs; everything the user sees
//! (form values, delivered images, the loading flag, the last error) lives here.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::{
    archive,
    error::{PoseGenError, Result},
    models::{
        AspectRatio, GeneratedImage, GenerationRequest, ProgressState, RunSummary, SourceImage,
        DEFAULT_POSE_COUNT, DEFAULT_THEME,
    },
    orchestrator::{GenerationObserver, Orchestrator},
};

#[derive(Debug, Clone)]
pub struct GenerationSession {
    pub source: Option<SourceImage>,
    pub theme: String,
    pub aspect_ratio: AspectRatio,
    pub pose_count: usize,
    images: Vec<GeneratedImage>,
    is_loading: bool,
    progress: Option<ProgressState>,
    error: Option<String>,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self {
            source: None,
            theme: DEFAULT_THEME.to_string(),
            aspect_ratio: AspectRatio::default(),
            pose_count: DEFAULT_POSE_COUNT,
            images: Vec::new(),
            is_loading: false,
            progress: None,
            error: None,
        }
    }
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new upload invalidates whatever the previous photo produced.
    pub fn set_source(&mut self, source: SourceImage) {
        self.source = Some(source);
        self.images.clear();
        self.error = None;
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Last progress reported by the most recent successful run.
    pub fn progress(&self) -> Option<&ProgressState> {
        self.progress.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generate_button_text(&self) -> String {
        if self.is_loading {
            "Generating...".to_string()
        } else if self.pose_count == 1 {
            "Generate 1 Pose".to_string()
        } else {
            format!("Generate {} Poses", self.pose_count)
        }
    }

    pub fn build_request(&self) -> Result<GenerationRequest> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| PoseGenError::InvalidInput("Please upload an image first.".into()))?;

        if self.theme.trim().is_empty() {
            return Err(PoseGenError::InvalidInput(
                "Please enter a prompt describing the scene or theme.".into(),
            ));
        }

        if self.pose_count == 0 {
            return Err(PoseGenError::InvalidInput(
                "Please choose at least one pose.".into(),
            ));
        }

        Ok(GenerationRequest::new(source, self.theme.trim())
            .with_aspect_ratio(self.aspect_ratio)
            .with_pose_count(self.pose_count))
    }

    /// Runs one generation. Validation failures never reach the orchestrator.
    ///
    /// `forward` sees every event as it happens, for live rendering.
    pub async fn run(
        &mut self,
        orchestrator: &Orchestrator,
        forward: Option<&dyn GenerationObserver>,
    ) -> Result<RunSummary> {
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                self.error = Some(e.user_message());
                return Err(e);
            }
        };

        self.is_loading = true;
        self.error = None;
        self.images.clear();
        self.progress = None;

        let observer = SessionObserver {
            images: Mutex::new(Vec::new()),
            progress: Mutex::new(None),
            forward,
        };

        let result = orchestrator.generate_poses(&request, &observer).await;

        self.images = observer
            .images
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        self.is_loading = false;

        match &result {
            Ok(_) => {
                self.progress = observer
                    .progress
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Err(e) => self.error = Some(e.user_message()),
        }
        result
    }

    /// Packages the current images into a zip at `path`. Returns `Ok(None)`
    /// without touching the filesystem when there is nothing to package.
    pub fn download_all(&mut self, path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        if self.images.is_empty() {
            return Ok(None);
        }

        match archive::write_archive(path.as_ref(), &self.images) {
            Ok(()) => Ok(Some(path.as_ref().to_path_buf())),
            Err(e) => {
                log::error!("Error zipping files: {}", e);
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

struct SessionObserver<'a> {
    images: Mutex<Vec<GeneratedImage>>,
    progress: Mutex<Option<ProgressState>>,
    forward: Option<&'a dyn GenerationObserver>,
}

impl GenerationObserver for SessionObserver<'_> {
    fn on_progress(&self, progress: &ProgressState) {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = Some(progress.clone());
        if let Some(forward) = self.forward {
            forward.on_progress(progress);
        }
    }

    fn on_image(&self, image: GeneratedImage) {
        if let Some(forward) = self.forward {
            forward.on_image(image.clone());
        }
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(image);
    }

    fn on_done(&self, summary: &RunSummary) {
        if let Some(forward) = self.forward {
            forward.on_done(summary);
        }
    }

    fn on_failed(&self, error: &PoseGenError) {
        if let Some(forward) = self.forward {
            forward.on_failed(error);
        }
    }
}
