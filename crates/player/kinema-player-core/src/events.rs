//! Player-level notifications delivered through the observer bus.

use serde::{Deserialize, Serialize};

/// One notification per player occurrence, in the order the player produced them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
#[non_exhaustive]
pub enum PlayerEvent {
    Load,
    LoadError { message: String },
    Play,
    Pause,
    Stop,
    Frame { frame_no: f32 },
    Render { frame_no: f32 },
    Loop { loop_count: u32 },
    Complete,
    TweenStarted { from: f32, to: f32 },
    TweenCompleted { frame_no: f32 },
}

impl PlayerEvent {
    /// Short name, handy for logs and test assertions.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Load => "load",
            PlayerEvent::LoadError { .. } => "load_error",
            PlayerEvent::Play => "play",
            PlayerEvent::Pause => "pause",
            PlayerEvent::Stop => "stop",
            PlayerEvent::Frame { .. } => "frame",
            PlayerEvent::Render { .. } => "render",
            PlayerEvent::Loop { .. } => "loop",
            PlayerEvent::Complete => "complete",
            PlayerEvent::TweenStarted { .. } => "tween_started",
            PlayerEvent::TweenCompleted { .. } => "tween_completed",
        }
    }
}
