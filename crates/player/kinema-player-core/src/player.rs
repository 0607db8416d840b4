//! The player facade: one animation, one config, one scheduler, at most one tween.

use std::sync::Arc;

use serde::Serialize;

use crate::animation::{Animation, AnimationDecoder, AnimationLibrary, Marker};
use crate::config::{FrameBounds, PlaybackConfig};
use crate::easing::Easing;
use crate::engine::PlaybackEngine;
use crate::error::{PlayerError, Result};
use crate::events::PlayerEvent;
use crate::observer::{ObserverBus, ObserverSink, SubscriptionId};
use crate::renderer::{Rasterizer, Viewport};
use crate::scheduler::{present_frame, PlaybackScheduler};
use crate::state::Status;
use crate::tween::{TweenDestination, TweenEngine};

/// What a `tick` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutput {
    pub frame: f32,
    pub rendered: bool,
    pub looped: bool,
    pub completed: bool,
    pub tween_completed: bool,
}

pub struct Player {
    rasterizer: Box<dyn Rasterizer>,
    library: AnimationLibrary,
    animation: Option<Animation>,
    active_id: Option<String>,
    config: PlaybackConfig,
    scheduler: PlaybackScheduler,
    tween: TweenEngine,
    viewport: Viewport,
    observers: Arc<ObserverBus<PlayerEvent>>,
    last_emitted: Option<f32>,
    last_rendered: Option<f32>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("active_id", &self.active_id)
            .field("config", &self.config)
            .field("state", self.scheduler.state())
            .field("tween", &self.tween.target())
            .finish()
    }
}

impl Player {
    pub fn new(rasterizer: impl Rasterizer + 'static) -> Self {
        Self::with_config(rasterizer, PlaybackConfig::default())
    }

    /// The config is taken as-is; call `set_config` to have it validated.
    pub fn with_config(rasterizer: impl Rasterizer + 'static, config: PlaybackConfig) -> Self {
        Self {
            rasterizer: Box::new(rasterizer),
            library: AnimationLibrary::new(),
            animation: None,
            active_id: None,
            config,
            scheduler: PlaybackScheduler::new(),
            tween: TweenEngine::new(),
            viewport: Viewport::default(),
            observers: Arc::new(ObserverBus::new()),
            last_emitted: None,
            last_rendered: None,
        }
    }

    // ----- observers -----

    pub fn subscribe<S>(&self, sink: &Arc<S>) -> SubscriptionId
    where
        S: ObserverSink<PlayerEvent> + 'static,
    {
        self.observers.subscribe(sink)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Shared handle to the bus, for listeners that manage their own subscription.
    pub fn observers(&self) -> Arc<ObserverBus<PlayerEvent>> {
        Arc::clone(&self.observers)
    }

    fn emit(&self, event: PlayerEvent) {
        log::trace!("player event: {}", event.name());
        self.observers.emit(&event);
    }

    // ----- loading -----

    /// Replace the active animation. An invalid animation leaves the player untouched.
    pub fn load_animation(&mut self, animation: Animation) -> Result<()> {
        if let Err(err) = animation.check() {
            self.emit(PlayerEvent::LoadError {
                message: err.to_string(),
            });
            return Err(err);
        }
        self.install(animation, None)
    }

    /// Decode `bytes` with the host's decoder, then load.
    pub fn load_with(&mut self, decoder: &dyn AnimationDecoder, bytes: &[u8]) -> Result<()> {
        match decoder.decode(bytes) {
            Ok(animation) => self.load_animation(animation),
            Err(reason) => {
                let err = PlayerError::Decode { reason };
                self.emit(PlayerEvent::LoadError {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Make an animation available to `load_animation_by_id`.
    pub fn register_animation(&mut self, id: impl Into<String>, animation: Animation) -> Result<()> {
        animation.check()?;
        self.library.insert(id, animation);
        Ok(())
    }

    /// Activate a registered animation; `ResourceNotFound` leaves the current one in place.
    pub fn load_animation_by_id(&mut self, id: &str) -> Result<()> {
        let animation = self
            .library
            .get(id)
            .cloned()
            .ok_or_else(|| PlayerError::ResourceNotFound { id: id.to_string() })?;
        self.install(animation, Some(id.to_string()))
    }

    pub fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    fn install(&mut self, animation: Animation, id: Option<String>) -> Result<()> {
        if self.animation.is_some() && self.scheduler.status() != Status::Stopped {
            self.scheduler.set_status(Status::Stopped);
            self.emit(PlayerEvent::Stop);
        }
        self.tween.stop();
        let bounds = self.config.resolve_bounds(&animation);
        self.scheduler.rewind(self.config.mode, bounds);
        self.scheduler.set_status(Status::Stopped);
        log::debug!(
            "loaded animation {:?}: {} frames over {}s",
            id,
            animation.total_frames,
            animation.duration
        );
        self.animation = Some(animation);
        self.active_id = id;
        self.last_emitted = None;
        self.last_rendered = None;
        self.emit(PlayerEvent::Load);
        if self.config.autoplay {
            self.play()?;
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    fn loaded(&self) -> Result<&Animation> {
        self.animation
            .as_ref()
            .ok_or_else(|| PlayerError::invalid_state("no animation loaded"))
    }

    fn bounds(&self) -> Result<FrameBounds> {
        Ok(self.config.resolve_bounds(self.loaded()?))
    }

    // ----- lifecycle -----

    /// Start or resume. A completed run restarts at the origin bound; a stopped one
    /// starts wherever `stop` or a later `seek` left it.
    pub fn play(&mut self) -> Result<()> {
        let bounds = self.bounds()?;
        match self.scheduler.status() {
            Status::Playing => return Ok(()),
            Status::Complete => self.scheduler.rewind(self.config.mode, bounds),
            Status::Stopped | Status::Paused => {}
        }
        self.scheduler.set_status(Status::Playing);
        self.emit(PlayerEvent::Play);
        Ok(())
    }

    /// Pause a playing animation; a no-op otherwise.
    pub fn pause(&mut self) -> Result<()> {
        self.loaded()?;
        if self.scheduler.status() == Status::Playing {
            self.scheduler.set_status(Status::Paused);
            self.emit(PlayerEvent::Pause);
        }
        Ok(())
    }

    /// Return to the origin bound, clear loop progress and cancel any tween.
    pub fn stop(&mut self) -> Result<()> {
        let bounds = self.bounds()?;
        self.tween.stop();
        self.scheduler.rewind(self.config.mode, bounds);
        if self.scheduler.status() != Status::Stopped {
            self.scheduler.set_status(Status::Stopped);
            self.emit(PlayerEvent::Stop);
        }
        Ok(())
    }

    /// Jump to `frame` inside the active bounds. A completed run becomes paused.
    pub fn seek(&mut self, frame: f32) -> Result<()> {
        let bounds = self.bounds()?;
        if !(frame.is_finite() && bounds.contains(frame)) {
            return Err(PlayerError::invalid_state(format!(
                "frame {frame} outside [{}, {}]",
                bounds.start, bounds.end
            )));
        }
        self.tween.stop();
        self.scheduler.set_frame(frame);
        if self.scheduler.status() == Status::Complete {
            self.scheduler.set_status(Status::Paused);
        }
        self.emit_frame_if_changed();
        Ok(())
    }

    /// Fraction of the active range covered by the current frame.
    pub fn progress(&self) -> f32 {
        match self.bounds() {
            Ok(b) if b.span() > 0.0 => (self.scheduler.raw_frame() - b.start) / b.span(),
            _ => 0.0,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(PlayerError::invalid_state(format!(
                "progress {progress} outside [0, 1]"
            )));
        }
        let b = self.bounds()?;
        self.seek(b.start + progress * b.span())
    }

    /// Replace the whole config. Validation happens before anything changes.
    pub fn set_config(&mut self, config: PlaybackConfig) -> Result<()> {
        config.validate()?;
        let previous_mode = self.config.mode;
        self.config = config;
        self.scheduler.align_direction(previous_mode, self.config.mode);
        if let Some(animation) = self.animation.as_ref() {
            let bounds = self.config.resolve_bounds(animation);
            if !bounds.contains(self.scheduler.raw_frame()) {
                self.scheduler.rewind(self.config.mode, bounds);
                self.scheduler.reset_loops();
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = Viewport::new(x, y, width, height);
        self.last_rendered = None;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ----- queries -----

    pub fn status(&self) -> Status {
        self.scheduler.status()
    }

    pub fn is_playing(&self) -> bool {
        self.status() == Status::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.status() == Status::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.status() == Status::Stopped
    }

    pub fn is_complete(&self) -> bool {
        self.status() == Status::Complete
    }

    /// Presented frame.
    pub fn current_frame(&self) -> f32 {
        self.scheduler.presented_frame(&self.config)
    }

    pub fn total_frames(&self) -> f32 {
        self.animation.as_ref().map_or(0.0, |a| a.total_frames)
    }

    /// Seconds.
    pub fn duration(&self) -> f32 {
        self.animation.as_ref().map_or(0.0, |a| a.duration)
    }

    /// Seconds covered by the active bounds at speed 1.
    pub fn segment_duration(&self) -> f32 {
        match (self.animation.as_ref(), self.bounds()) {
            (Some(a), Ok(b)) if a.total_frames > 0.0 => b.span() / a.total_frames * a.duration,
            _ => 0.0,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        self.animation
            .as_ref()
            .map_or(&[][..], |a| a.markers.as_slice())
    }

    pub fn loop_count(&self) -> u32 {
        self.scheduler.loops_completed()
    }

    pub fn reset_loop_count(&mut self) {
        self.scheduler.reset_loops();
    }

    pub fn active_animation_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn buffer(&self) -> &[u32] {
        self.rasterizer.buffer()
    }

    // ----- tweens -----

    pub fn tween_to(&mut self, frame: f32, duration_ms: f32, easing: Option<[f32; 4]>) -> Result<()> {
        self.start_tween(TweenDestination::Frame(frame), duration_ms, easing)
    }

    pub fn tween_to_marker(
        &mut self,
        marker: &str,
        duration_ms: f32,
        easing: Option<[f32; 4]>,
    ) -> Result<()> {
        self.start_tween(TweenDestination::Marker(marker.to_string()), duration_ms, easing)
    }

    fn start_tween(
        &mut self,
        destination: TweenDestination,
        duration_ms: f32,
        easing: Option<[f32; 4]>,
    ) -> Result<()> {
        let animation = self
            .animation
            .as_ref()
            .ok_or_else(|| PlayerError::invalid_state("no animation loaded"))?;
        let easing = easing.map_or(Easing::Linear, Easing::CubicBezier);
        let from = self.scheduler.raw_frame();
        let target = self
            .tween
            .start(from, destination, duration_ms, easing, animation)?;
        let (from, to) = (target.from_frame, target.to_frame);
        self.emit(PlayerEvent::TweenStarted { from, to });
        Ok(())
    }

    /// Cancel the tween in flight; the frame stays where the tween left it.
    pub fn tween_stop(&mut self) -> bool {
        self.tween.stop()
    }

    pub fn is_tweening(&self) -> bool {
        self.tween.is_active()
    }

    // ----- frame loop -----

    /// Advance by `elapsed_ms`, render if the frame changed, and notify.
    ///
    /// A tween in flight drives the frame instead of the scheduler. When the
    /// rasterizer fails, playback and tween state are rolled back to before the call.
    pub fn tick(&mut self, elapsed_ms: f32) -> Result<TickOutput> {
        let animation = self
            .animation
            .as_ref()
            .ok_or_else(|| PlayerError::invalid_state("no animation loaded"))?;
        let saved_state = self.scheduler.state().clone();
        let saved_tween = self.tween.target().cloned();

        let mut out = TickOutput::default();
        if self.tween.is_active() {
            let step = self.tween.update(elapsed_ms)?;
            self.scheduler.set_frame(step.frame);
            out.tween_completed = step.completed;
            out.frame = self.scheduler.presented_frame(&self.config);
        } else {
            let r = self
                .scheduler
                .advance(Some(animation), &self.config, elapsed_ms)?;
            out.frame = r.frame;
            out.looped = r.looped;
            out.completed = r.completed;
        }

        if self.last_rendered != Some(out.frame) {
            if let Err(reason) = self.rasterizer.render(animation, out.frame, self.viewport) {
                self.scheduler.restore(saved_state);
                self.tween.restore(saved_tween);
                return Err(PlayerError::Render { reason });
            }
            self.last_rendered = Some(out.frame);
            out.rendered = true;
        }

        self.emit_frame_if_changed();
        if out.rendered {
            self.emit(PlayerEvent::Render {
                frame_no: out.frame,
            });
        }
        if out.tween_completed {
            self.emit(PlayerEvent::TweenCompleted {
                frame_no: out.frame,
            });
        }
        if out.looped {
            self.emit(PlayerEvent::Loop {
                loop_count: self.scheduler.loops_completed(),
            });
        }
        if out.completed {
            self.emit(PlayerEvent::Complete);
        }
        Ok(out)
    }

    /// Paint the current frame unless it is the one already painted.
    pub fn render_frame(&mut self) -> Result<bool> {
        let animation = self
            .animation
            .as_ref()
            .ok_or_else(|| PlayerError::invalid_state("no animation loaded"))?;
        let frame = present_frame(self.scheduler.raw_frame(), self.config.use_frame_interpolation);
        if self.last_rendered == Some(frame) {
            return Ok(false);
        }
        self.rasterizer
            .render(animation, frame, self.viewport)
            .map_err(|reason| PlayerError::Render { reason })?;
        self.last_rendered = Some(frame);
        self.emit(PlayerEvent::Render { frame_no: frame });
        Ok(true)
    }

    fn emit_frame_if_changed(&mut self) {
        let frame = self.current_frame();
        if self.last_emitted != Some(frame) {
            self.last_emitted = Some(frame);
            self.emit(PlayerEvent::Frame { frame_no: frame });
        }
    }
}

impl PlaybackEngine for Player {
    fn config(&self) -> PlaybackConfig {
        self.config.clone()
    }

    fn set_config(&mut self, config: PlaybackConfig) -> Result<()> {
        Player::set_config(self, config)
    }

    fn play(&mut self) -> Result<()> {
        Player::play(self)
    }

    fn pause(&mut self) -> Result<()> {
        Player::pause(self)
    }

    fn stop(&mut self) -> Result<()> {
        Player::stop(self)
    }

    fn seek(&mut self, frame: f32) -> Result<()> {
        Player::seek(self, frame)
    }

    fn set_progress(&mut self, progress: f32) -> Result<()> {
        Player::set_progress(self, progress)
    }

    fn is_loaded(&self) -> bool {
        Player::is_loaded(self)
    }

    fn current_frame(&self) -> f32 {
        Player::current_frame(self)
    }

    fn total_frames(&self) -> f32 {
        Player::total_frames(self)
    }

    fn markers(&self) -> Vec<Marker> {
        Player::markers(self).to_vec()
    }

    fn active_animation_id(&self) -> Option<String> {
        self.active_id.clone()
    }

    fn load_animation_by_id(&mut self, id: &str) -> Result<()> {
        Player::load_animation_by_id(self, id)
    }

    fn tween_to(&mut self, frame: f32, duration_ms: f32, easing: Option<[f32; 4]>) -> Result<()> {
        Player::tween_to(self, frame, duration_ms, easing)
    }

    fn tween_to_marker(
        &mut self,
        marker: &str,
        duration_ms: f32,
        easing: Option<[f32; 4]>,
    ) -> Result<()> {
        Player::tween_to_marker(self, marker, duration_ms, easing)
    }

    fn tween_stop(&mut self) -> bool {
        Player::tween_stop(self)
    }

    fn is_tweening(&self) -> bool {
        Player::is_tweening(self)
    }
}
