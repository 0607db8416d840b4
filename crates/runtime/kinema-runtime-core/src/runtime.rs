//! One player plus the state machine driving it.

use std::sync::Arc;

use kinema_player_core::{
    Animation, MetadataDecoder, ObserverSink, PlaybackConfig, Player, PlayerEvent, Rasterizer,
    SubscriptionId, TickOutput, Viewport,
};
use kinema_state_machine_core::{
    Event, StateMachineDefinition, StateMachineEngine, StateMachineEvent, Status, TriggerValue,
};

use crate::config::RuntimeConfig;
use crate::error::Result;

pub struct Runtime {
    player: Player,
    machine: StateMachineEngine,
    forward_playback_events: bool,
}

impl Runtime {
    pub fn new(rasterizer: impl Rasterizer + 'static, config: RuntimeConfig) -> Self {
        Self {
            player: Player::with_config(rasterizer, config.playback),
            machine: StateMachineEngine::with_config(config.state_machine),
            forward_playback_events: config.forward_playback_events,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn state_machine(&self) -> &StateMachineEngine {
        &self.machine
    }

    // ----- animations -----

    pub fn load_animation(&mut self, animation: Animation) -> Result<()> {
        Ok(self.player.load_animation(animation)?)
    }

    /// Decode an animation metadata document and activate it.
    pub fn load_animation_json(&mut self, json: &str) -> Result<()> {
        Ok(self.player.load_with(&MetadataDecoder, json.as_bytes())?)
    }

    pub fn register_animation(&mut self, id: impl Into<String>, animation: Animation) -> Result<()> {
        Ok(self.player.register_animation(id, animation)?)
    }

    pub fn load_animation_by_id(&mut self, id: &str) -> Result<()> {
        Ok(self.player.load_animation_by_id(id)?)
    }

    // ----- playback -----

    pub fn play(&mut self) -> Result<()> {
        Ok(self.player.play()?)
    }

    pub fn pause(&mut self) -> Result<()> {
        Ok(self.player.pause()?)
    }

    pub fn stop(&mut self) -> Result<()> {
        Ok(self.player.stop()?)
    }

    pub fn seek(&mut self, frame: f32) -> Result<()> {
        Ok(self.player.seek(frame)?)
    }

    pub fn set_progress(&mut self, progress: f32) -> Result<()> {
        Ok(self.player.set_progress(progress)?)
    }

    pub fn set_config(&mut self, config: PlaybackConfig) -> Result<()> {
        Ok(self.player.set_config(config)?)
    }

    pub fn config(&self) -> &PlaybackConfig {
        self.player.config()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.player
            .set_viewport(viewport.x, viewport.y, viewport.width, viewport.height);
    }

    /// Advance playback and forward completion and loops to a running machine.
    /// A machine waiting on a transition tween enters its target once the tween is over.
    pub fn tick(&mut self, elapsed_ms: f32) -> Result<TickOutput> {
        let out = self.player.tick(elapsed_ms)?;
        self.settle_tween();
        if self.forward_playback_events && self.machine.status() == Status::Running {
            if out.looped {
                self.forward(Event::LoopComplete);
            }
            if out.completed {
                self.forward(Event::Complete);
            }
        }
        Ok(out)
    }

    fn settle_tween(&mut self) {
        if self.machine.status() == Status::Tweening && !self.player.is_tweening() {
            self.machine.complete_tween(&mut self.player);
        }
    }

    fn forward(&mut self, event: Event) {
        // The machine may have stopped itself on the previous event.
        if self.machine.status() != Status::Running {
            return;
        }
        if let Err(err) = self.machine.post_event(&event, &mut self.player) {
            log::warn!("could not forward {} to the state machine: {err}", event.tag());
        }
    }

    pub fn render_frame(&mut self) -> Result<bool> {
        Ok(self.player.render_frame()?)
    }

    // ----- tweens -----

    pub fn tween_to(&mut self, frame: f32, duration_ms: f32, easing: Option<[f32; 4]>) -> Result<()> {
        Ok(self.player.tween_to(frame, duration_ms, easing)?)
    }

    pub fn tween_to_marker(
        &mut self,
        marker: &str,
        duration_ms: f32,
        easing: Option<[f32; 4]>,
    ) -> Result<()> {
        Ok(self.player.tween_to_marker(marker, duration_ms, easing)?)
    }

    /// Cancel the tween in flight. A machine waiting on it enters its target now.
    pub fn tween_stop(&mut self) -> bool {
        let stopped = self.player.tween_stop();
        self.settle_tween();
        stopped
    }

    pub fn is_tweening(&self) -> bool {
        self.player.is_tweening()
    }

    // ----- state machine -----

    pub fn load_state_machine(&mut self, json: &str) -> Result<()> {
        Ok(self.machine.load(json, &mut self.player)?)
    }

    pub fn load_state_machine_definition(&mut self, definition: StateMachineDefinition) -> Result<()> {
        Ok(self.machine.load_definition(definition, &mut self.player)?)
    }

    pub fn unload_state_machine(&mut self) -> Result<()> {
        Ok(self.machine.unload(&mut self.player)?)
    }

    pub fn state_machine_start(&mut self) -> Result<()> {
        Ok(self.machine.start(&mut self.player)?)
    }

    pub fn state_machine_stop(&mut self) -> Result<()> {
        Ok(self.machine.stop(&mut self.player)?)
    }

    pub fn state_machine_pause(&mut self) -> Result<()> {
        Ok(self.machine.pause()?)
    }

    pub fn state_machine_resume(&mut self) -> Result<()> {
        Ok(self.machine.resume()?)
    }

    pub fn post_event(&mut self, event: &Event) -> Result<bool> {
        Ok(self.machine.post_event(event, &mut self.player)?)
    }

    pub fn set_trigger(&mut self, name: &str, value: TriggerValue) -> Result<bool> {
        Ok(self.machine.set_trigger(name, value)?)
    }

    pub fn get_trigger(&self, name: &str) -> Result<TriggerValue> {
        Ok(self.machine.get_trigger(name)?)
    }

    pub fn reset_trigger(&mut self, name: &str) -> Result<bool> {
        Ok(self.machine.reset_trigger(name)?)
    }

    pub fn override_current_state(&mut self, state: &str, do_tick: bool) -> Result<()> {
        Ok(self
            .machine
            .override_current_state(state, do_tick, &mut self.player)?)
    }

    pub fn current_state(&self) -> Option<&str> {
        self.machine.current_state()
    }

    // ----- observers -----

    pub fn subscribe_player<S>(&self, sink: &Arc<S>) -> SubscriptionId
    where
        S: ObserverSink<PlayerEvent> + 'static,
    {
        self.player.subscribe(sink)
    }

    pub fn unsubscribe_player(&self, id: SubscriptionId) -> bool {
        self.player.unsubscribe(id)
    }

    pub fn subscribe_state_machine<S>(&self, sink: &Arc<S>) -> SubscriptionId
    where
        S: ObserverSink<StateMachineEvent> + 'static,
    {
        self.machine.subscribe(sink)
    }

    pub fn unsubscribe_state_machine(&self, id: SubscriptionId) -> bool {
        self.machine.unsubscribe(id)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("animation", &self.player.active_animation_id())
            .field("player", &self.player.status())
            .field("machine", &self.machine.status())
            .field("state", &self.machine.current_state())
            .finish()
    }
}
