//! Tick-driven frame advancement.
//!
//! The scheduler turns elapsed wall-clock time into a new frame position inside the
//! active [`FrameBounds`], honouring direction mode and loop policy. It never renders;
//! the caller decides whether a changed frame is worth painting.
//!
//! Loop accounting:
//! - `Forward`/`Reverse` wrap to the opposite bound when the terminal bound is reached.
//! - `Bounce`/`ReverseBounce` reflect unconditionally at the far bound; a cycle is
//!   counted (or the run completes) when the origin bound is reached again.
//! - Overflow past a bound is carried into the next leg, so large ticks stay in phase.

use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::config::{FrameBounds, Mode, PlaybackConfig};
use crate::error::{PlayerError, Result};
use crate::state::{PlaybackState, Status};

/// Outcome of a single `advance`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    /// Presented frame (floored when interpolation is off).
    pub frame: f32,
    /// At least one wrap or cycle happened during this advance.
    pub looped: bool,
    /// Playback reached its final bound during this advance.
    pub completed: bool,
    /// The presented frame differs from the one before the call.
    pub changed: bool,
}

#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    state: PlaybackState,
}

/// Round to 3 decimals, drops accumulated float noise from sub-frame positions.
#[inline]
fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

/// Presentation of a raw frame.
#[inline]
pub fn present_frame(raw: f32, use_frame_interpolation: bool) -> f32 {
    if use_frame_interpolation {
        round3(raw)
    } else {
        raw.floor()
    }
}

/// Whole cycles of length `cycle` that fit in `remaining`, capped by the loop budget,
/// plus the distance left over once they are dropped.
///
/// Infinite looping reduces by remainder so a huge distance cannot stall on f32 rounding.
fn fold_cycles(remaining: f32, cycle: f32, config: &PlaybackConfig, loops: u32) -> (u32, f32) {
    if cycle <= 0.0 || remaining < cycle {
        return (0, remaining);
    }
    let whole = (remaining / cycle).floor();
    let whole = if whole >= u32::MAX as f32 {
        u32::MAX
    } else {
        whole as u32
    };
    if config.loop_count == 0 {
        (whole, remaining % cycle)
    } else {
        let folded = whole.min(config.loop_count.saturating_sub(loops));
        (folded, remaining - folded as f32 * cycle)
    }
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.state.status = status;
    }

    pub fn loops_completed(&self) -> u32 {
        self.state.loops_completed
    }

    pub fn reset_loops(&mut self) {
        self.state.loops_completed = 0;
    }

    /// Raw frame position.
    pub fn raw_frame(&self) -> f32 {
        self.state.current_frame
    }

    pub fn presented_frame(&self, config: &PlaybackConfig) -> f32 {
        present_frame(self.state.current_frame, config.use_frame_interpolation)
    }

    /// Move to the mode's origin bound and clear loop progress.
    pub fn rewind(&mut self, mode: Mode, bounds: FrameBounds) {
        self.state.direction = mode.initial_direction();
        self.state.current_frame = if self.state.direction > 0.0 {
            bounds.start
        } else {
            bounds.end
        };
        self.state.loops_completed = 0;
    }

    /// Re-derive the direction after a mode change; keeps a bounce leg in progress.
    pub fn align_direction(&mut self, previous: Mode, mode: Mode) {
        if previous != mode {
            self.state.direction = mode.initial_direction();
        }
    }

    pub(crate) fn restore(&mut self, state: PlaybackState) {
        self.state = state;
    }

    /// Place the frame directly. Bounds checks are the caller's job.
    pub fn set_frame(&mut self, frame: f32) {
        self.state.current_frame = frame;
    }

    /// Advance by `elapsed_ms` of wall-clock time.
    ///
    /// Fails with `InvalidState` when nothing is loaded or the active range is empty;
    /// the frame is left untouched in that case. A non-playing scheduler reports its
    /// current frame without moving.
    pub fn advance(
        &mut self,
        animation: Option<&Animation>,
        config: &PlaybackConfig,
        elapsed_ms: f32,
    ) -> Result<FrameResult> {
        let animation =
            animation.ok_or_else(|| PlayerError::invalid_state("no animation loaded"))?;
        let bounds = config.resolve_bounds(animation);
        if bounds.span() <= 0.0 {
            return Err(PlayerError::invalid_state(format!(
                "empty frame range [{}, {}]",
                bounds.start, bounds.end
            )));
        }

        let before = self.presented_frame(config);
        if self.state.status != Status::Playing || !(elapsed_ms.is_finite() && elapsed_ms > 0.0)
        {
            return Ok(FrameResult {
                frame: before,
                ..Default::default()
            });
        }

        let span = bounds.span();
        let origin = if config.mode.initial_direction() > 0.0 {
            bounds.start
        } else {
            bounds.end
        };
        let mut frame = bounds.clamp(self.state.current_frame);
        let mut dir = if self.state.direction < 0.0 { -1.0 } else { 1.0 };
        let mut remaining = elapsed_ms * animation.frames_per_ms() * config.speed;
        if !remaining.is_finite() {
            return Err(PlayerError::invalid_state(format!(
                "advance of {elapsed_ms}ms at speed {} overflows the frame range",
                config.speed
            )));
        }
        let mut looped = false;
        let mut completed = false;

        loop {
            let target = if dir > 0.0 { bounds.end } else { bounds.start };
            let distance = (target - frame).abs();
            if remaining < distance {
                frame += dir * remaining;
                break;
            }
            remaining -= distance;
            frame = target;

            let at_far_bound = config.mode.is_bounce() && target != origin;
            if at_far_bound {
                dir = -dir;
                continue;
            }
            if !config.allows_another_loop(self.state.loops_completed) {
                self.state.status = Status::Complete;
                completed = true;
                break;
            }
            self.state.loops_completed = self.state.loops_completed.saturating_add(1);
            looped = true;
            let cycle = if config.mode.is_bounce() {
                dir = -dir;
                2.0 * span
            } else {
                frame = if dir > 0.0 { bounds.start } else { bounds.end };
                span
            };
            let (folded, left) = fold_cycles(remaining, cycle, config, self.state.loops_completed);
            self.state.loops_completed = self.state.loops_completed.saturating_add(folded);
            remaining = left;
        }

        self.state.current_frame = frame;
        self.state.direction = dir;
        let presented = self.presented_frame(config);
        log::trace!(
            "advance {elapsed_ms}ms -> frame {presented} (looped={looped}, completed={completed})"
        );
        Ok(FrameResult {
            frame: presented,
            looped,
            completed,
            changed: presented != before,
        })
    }
}
