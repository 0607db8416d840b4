//! Mutable playback state.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Playing,
    Paused,
    #[default]
    Stopped,
    Complete,
}

/// Written by the scheduler or the tween, never both in the same tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Unrounded frame position.
    pub current_frame: f32,
    /// +1 or -1.
    pub direction: f32,
    pub loops_completed: u32,
    pub status: Status,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_frame: 0.0,
            direction: 1.0,
            loops_completed: 0,
            status: Status::Stopped,
        }
    }
}

impl PlaybackState {
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status == Status::Playing
    }
}
