//! Host-initiated interpolation of the current frame.

use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::easing::Easing;
use crate::error::{PlayerError, Result};

/// Where a tween ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TweenDestination {
    Frame(f32),
    /// Start frame of the first marker with this name.
    Marker(String),
}

/// A tween in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweenTarget {
    pub from_frame: f32,
    pub to_frame: f32,
    pub duration_ms: f32,
    pub elapsed_ms: f32,
    pub easing: Easing,
}

/// Result of one `update`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TweenStep {
    pub frame: f32,
    /// True exactly once, on the update that lands on `to_frame`.
    pub completed: bool,
}

#[derive(Debug, Default)]
pub struct TweenEngine {
    active: Option<TweenTarget>,
}

impl TweenEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn target(&self) -> Option<&TweenTarget> {
        self.active.as_ref()
    }

    /// Begin a tween from `from_frame`, replacing any tween in flight.
    ///
    /// Fails with `InvalidState` for a non-positive duration or an out-of-range frame,
    /// and with `NotFound` for an unknown marker. Nothing changes on failure.
    pub fn start(
        &mut self,
        from_frame: f32,
        destination: TweenDestination,
        duration_ms: f32,
        easing: Easing,
        animation: &Animation,
    ) -> Result<&TweenTarget> {
        if !(duration_ms.is_finite() && duration_ms > 0.0) {
            return Err(PlayerError::invalid_state(format!(
                "tween duration must be > 0, got {duration_ms}"
            )));
        }
        let to_frame = match destination {
            TweenDestination::Frame(f) => f,
            TweenDestination::Marker(name) => {
                animation
                    .marker(&name)
                    .ok_or_else(|| PlayerError::not_found("marker", name.as_str()))?
                    .time
            }
        };
        if !(to_frame.is_finite() && (0.0..=animation.last_frame()).contains(&to_frame)) {
            return Err(PlayerError::invalid_state(format!(
                "tween target {to_frame} outside [0, {}]",
                animation.last_frame()
            )));
        }
        log::debug!("tween {from_frame} -> {to_frame} over {duration_ms}ms");
        Ok(&*self.active.insert(TweenTarget {
            from_frame,
            to_frame,
            duration_ms,
            elapsed_ms: 0.0,
            easing,
        }))
    }

    /// Advance the tween. Completion lands exactly on the target and tears the tween down.
    pub fn update(&mut self, elapsed_ms: f32) -> Result<TweenStep> {
        let tween = self
            .active
            .as_mut()
            .ok_or_else(|| PlayerError::invalid_state("no tween in flight"))?;
        tween.elapsed_ms += elapsed_ms.max(0.0);
        let t = (tween.elapsed_ms / tween.duration_ms).min(1.0);
        if t >= 1.0 {
            let frame = tween.to_frame;
            self.active = None;
            return Ok(TweenStep {
                frame,
                completed: true,
            });
        }
        let eased = tween.easing.apply(t);
        Ok(TweenStep {
            frame: tween.from_frame + (tween.to_frame - tween.from_frame) * eased,
            completed: false,
        })
    }

    pub(crate) fn restore(&mut self, target: Option<TweenTarget>) {
        self.active = target;
    }

    /// Cancel without completing. Returns whether a tween was in flight.
    pub fn stop(&mut self) -> bool {
        self.active.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Marker;

    fn anim() -> Animation {
        Animation::new(100.0, 1.0).with_markers(vec![Marker::new("end", 90.0, 9.0)])
    }

    #[test]
    fn start_rejects_bad_inputs_without_activating() {
        let mut tw = TweenEngine::new();
        let a = anim();
        assert!(tw
            .start(0.0, TweenDestination::Frame(10.0), 0.0, Easing::Linear, &a)
            .is_err());
        assert!(tw
            .start(0.0, TweenDestination::Frame(100.0), 10.0, Easing::Linear, &a)
            .is_err());
        let err = tw
            .start(
                0.0,
                TweenDestination::Marker("nope".into()),
                10.0,
                Easing::Linear,
                &a,
            )
            .unwrap_err();
        assert!(matches!(err, PlayerError::NotFound { .. }));
        assert!(!tw.is_active());
    }

    #[test]
    fn linear_midpoint_then_exact_landing() {
        let mut tw = TweenEngine::new();
        tw.start(10.0, TweenDestination::Frame(20.0), 100.0, Easing::Linear, &anim())
            .unwrap();
        let step = tw.update(50.0).unwrap();
        assert!((step.frame - 15.0).abs() < 1e-5);
        assert!(!step.completed);
        let step = tw.update(80.0).unwrap();
        assert_eq!(step.frame, 20.0);
        assert!(step.completed);
        assert!(!tw.is_active());
        assert!(tw.update(1.0).is_err());
    }

    #[test]
    fn marker_destination_uses_marker_start() {
        let mut tw = TweenEngine::new();
        let target = tw
            .start(
                0.0,
                TweenDestination::Marker("end".into()),
                10.0,
                Easing::Linear,
                &anim(),
            )
            .unwrap();
        assert_eq!(target.to_frame, 90.0);
    }

    #[test]
    fn stop_keeps_nothing_in_flight() {
        let mut tw = TweenEngine::new();
        tw.start(0.0, TweenDestination::Frame(5.0), 10.0, Easing::Linear, &anim())
            .unwrap();
        assert!(tw.stop());
        assert!(!tw.stop());
    }
}
