use serde::{Deserialize, Serialize};

use super::image::GeneratedImage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub message: String,
    pub completed: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn ideating() -> Self {
        Self {
            message: "Generating creative pose ideas...".to_string(),
            completed: 0,
            total: 0,
        }
    }

    pub fn ideas_ready(total: usize) -> Self {
        Self {
            message: format!("Got {} ideas! Now generating images...", total),
            completed: 0,
            total,
        }
    }

    pub fn fan_out(completed: usize, total: usize) -> Self {
        Self {
            message: format!("Generating images... ({}/{})", completed, total),
            completed,
            total,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Ideating,
    ImageFanOut,
    Completed,
    Failed,
}

impl RunState {
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Ideating)
                | (RunState::Ideating, RunState::ImageFanOut)
                | (RunState::Ideating, RunState::Failed)
                | (RunState::ImageFanOut, RunState::Completed)
        )
    }
}

/// What a finished run produced. `delivered` may be lower than `ideas`, which
/// may in turn be lower than `requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub requested: usize,
    pub ideas: usize,
    pub delivered: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn dropped(&self) -> usize {
        self.ideas.saturating_sub(self.delivered)
    }
}

#[derive(Debug, Clone)]
pub enum GenerationEvent {
    Progress(ProgressState),
    Image(GeneratedImage),
    Done(RunSummary),
    Failed(String),
}
