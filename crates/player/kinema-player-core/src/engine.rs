//! The narrow playback surface other components drive.

use crate::animation::Marker;
use crate::config::PlaybackConfig;
use crate::error::Result;

/// What a state machine (or any other controller) may do to a player.
pub trait PlaybackEngine {
    fn config(&self) -> PlaybackConfig;
    fn set_config(&mut self, config: PlaybackConfig) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn seek(&mut self, frame: f32) -> Result<()>;
    /// Seek to a fraction of the active range.
    fn set_progress(&mut self, progress: f32) -> Result<()>;
    fn is_loaded(&self) -> bool;
    fn current_frame(&self) -> f32;
    fn total_frames(&self) -> f32;
    fn markers(&self) -> Vec<Marker>;
    fn active_animation_id(&self) -> Option<String>;
    fn load_animation_by_id(&mut self, id: &str) -> Result<()>;
    fn tween_to(&mut self, frame: f32, duration_ms: f32, easing: Option<[f32; 4]>) -> Result<()>;
    /// Tween to the start of a marker of the active animation.
    fn tween_to_marker(
        &mut self,
        marker: &str,
        duration_ms: f32,
        easing: Option<[f32; 4]>,
    ) -> Result<()>;
    fn tween_stop(&mut self) -> bool;
    fn is_tweening(&self) -> bool;
}
