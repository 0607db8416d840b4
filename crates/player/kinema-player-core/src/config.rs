//! Playback configuration.

use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::error::{PlayerError, Result};

/// Direction policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Forward,
    Reverse,
    Bounce,
    ReverseBounce,
}

impl Mode {
    /// Direction sign a fresh run starts with.
    #[inline]
    pub fn initial_direction(self) -> f32 {
        match self {
            Mode::Forward | Mode::Bounce => 1.0,
            Mode::Reverse | Mode::ReverseBounce => -1.0,
        }
    }

    #[inline]
    pub fn is_bounce(self) -> bool {
        matches!(self, Mode::Bounce | Mode::ReverseBounce)
    }
}

/// Player configuration. Replaced as a whole through `Player::set_config`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    pub mode: Mode,
    #[serde(rename = "loop")]
    pub loop_animation: bool,
    /// 0 = loop forever.
    pub loop_count: u32,
    /// Multiplier on the animation's native rate. Must be > 0.
    pub speed: f32,
    /// Active frame range `(start, end)`; ignored when `marker` resolves.
    pub segment: Option<(f32, f32)>,
    /// Report fractional frames instead of flooring them.
    pub use_frame_interpolation: bool,
    pub marker: Option<String>,
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Forward,
            loop_animation: false,
            loop_count: 0,
            speed: 1.0,
            segment: None,
            use_frame_interpolation: true,
            marker: None,
            autoplay: false,
        }
    }
}

/// Resolved `[start, end]` frame window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameBounds {
    pub start: f32,
    pub end: f32,
}

impl FrameBounds {
    #[inline]
    pub fn span(&self) -> f32 {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, frame: f32) -> bool {
        frame >= self.start && frame <= self.end
    }

    #[inline]
    pub fn clamp(&self, frame: f32) -> f32 {
        frame.clamp(self.start, self.end.max(self.start))
    }
}

impl PlaybackConfig {
    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(PlayerError::invalid_config(format!(
                "speed must be > 0, got {}",
                self.speed
            )));
        }
        if let Some((start, end)) = self.segment {
            if !(start.is_finite() && end.is_finite()) || start < 0.0 || start >= end {
                return Err(PlayerError::invalid_config(format!(
                    "segment [{start}, {end}] must satisfy 0 <= start < end"
                )));
            }
        }
        Ok(())
    }

    /// Whether another wrap or reflection is allowed after `loops_completed` cycles.
    #[inline]
    pub fn allows_another_loop(&self, loops_completed: u32) -> bool {
        self.loop_animation && (self.loop_count == 0 || loops_completed < self.loop_count)
    }

    /// Marker window if the marker exists, else the segment, else the whole timeline.
    /// The result is clamped to the animation.
    pub fn resolve_bounds(&self, animation: &Animation) -> FrameBounds {
        let last = animation.last_frame();
        let (start, end) = match self.marker.as_deref() {
            Some(name) => match animation.marker(name) {
                Some(m) => (m.time, m.end()),
                None => {
                    log::warn!("marker '{name}' not found; falling back to segment");
                    self.segment_or_full(last)
                }
            },
            None => self.segment_or_full(last),
        };
        FrameBounds {
            start: start.clamp(0.0, last),
            end: end.clamp(0.0, last),
        }
    }

    fn segment_or_full(&self, last: f32) -> (f32, f32) {
        match self.segment {
            Some((s, e)) if s < e => (s, e),
            _ => (0.0, last),
        }
    }
}
