//! The state-machine engine.
//!
//! One engine hosts at most one loaded machine. Every operation mutates the instance
//! first and collects its notifications into an outbox; the outbox is dispatched once
//! the instance is consistent again, so listeners never observe a half-applied
//! transition. Trigger notifications raised while a transition is evaluated are
//! deferred until after its exit/transition/entered triple.
//!
//! A tweened transition splits that triple: exit and transition are reported when the
//! player starts gliding, entered once the host reports the tween finished through
//! [`StateMachineEngine::complete_tween`]. Posted events are ignored in between.

use std::collections::VecDeque;
use std::sync::Arc;

use kinema_player_core::{ObserverBus, ObserverSink, PlaybackConfig, PlaybackEngine, SubscriptionId};
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionContext};
use crate::config::StateMachineConfig;
use crate::definition::{PlaybackSettings, State, StateMachineDefinition, Transition};
use crate::error::{Result, StateMachineError};
use crate::event::Event;
use crate::guard::all_hold;
use crate::notification::StateMachineEvent;
use crate::trigger::{TriggerStore, TriggerValue};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Stopped,
    Running,
    Paused,
    /// A tweened transition is in flight; the target has not been entered yet.
    Tweening,
}

/// Host-facing state-machine surface.
pub trait StateMachine {
    fn load(&mut self, json: &str, player: &mut dyn PlaybackEngine) -> Result<()>;
    fn start(&mut self, player: &mut dyn PlaybackEngine) -> Result<()>;
    fn stop(&mut self, player: &mut dyn PlaybackEngine) -> Result<()>;
    /// Returns whether a transition fired.
    fn post_event(&mut self, event: &Event, player: &mut dyn PlaybackEngine) -> Result<bool>;
    fn set_trigger(&mut self, name: &str, value: TriggerValue) -> Result<bool>;
    fn get_trigger(&self, name: &str) -> Result<TriggerValue>;
    fn override_current_state(
        &mut self,
        state: &str,
        do_tick: bool,
        player: &mut dyn PlaybackEngine,
    ) -> Result<()>;
    fn current_state(&self) -> Option<&str>;
}

#[derive(Debug)]
struct Instance {
    definition: Arc<StateMachineDefinition>,
    triggers: TriggerStore,
    current: Option<usize>,
    status: Status,
    /// Player config captured by `start`, restored by `stop`.
    cached_config: Option<PlaybackConfig>,
    /// Target of the tweened transition in flight.
    pending: Option<usize>,
    /// Synthetic events queued behind a tweened transition.
    deferred: Vec<Event>,
}

impl Instance {
    /// Drop a tween in flight. Returns whether there was one.
    fn abandon_tween(&mut self, player: &mut dyn PlaybackEngine) -> bool {
        if self.status != Status::Tweening {
            return false;
        }
        player.tween_stop();
        self.pending = None;
        self.deferred.clear();
        self.status = Status::Running;
        true
    }
}

#[derive(Debug, Default)]
pub struct StateMachineEngine {
    config: StateMachineConfig,
    machine: Option<Instance>,
    observers: Arc<ObserverBus<StateMachineEvent>>,
}

impl StateMachineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StateMachineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> StateMachineConfig {
        self.config
    }

    // ----- observers -----

    pub fn subscribe<S>(&self, sink: &Arc<S>) -> SubscriptionId
    where
        S: ObserverSink<StateMachineEvent> + 'static,
    {
        self.observers.subscribe(sink)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn observers(&self) -> Arc<ObserverBus<StateMachineEvent>> {
        Arc::clone(&self.observers)
    }

    // ----- loading -----

    /// Parse, validate and install a machine. On failure the loaded machine, if any,
    /// is left untouched. A running machine is stopped before it is replaced.
    pub fn load(&mut self, json: &str, player: &mut dyn PlaybackEngine) -> Result<()> {
        let definition = StateMachineDefinition::from_json(json)?;
        self.load_definition(definition, player)
    }

    pub fn load_definition(
        &mut self,
        definition: StateMachineDefinition,
        player: &mut dyn PlaybackEngine,
    ) -> Result<()> {
        definition.validate()?;
        let triggers = definition.trigger_store()?;
        self.stop(player)?;
        log::debug!(
            "state machine loaded: {} states, {} triggers, initial '{}'",
            definition.states.len(),
            triggers.len(),
            definition.initial
        );
        self.machine = Some(Instance {
            definition: Arc::new(definition),
            triggers,
            current: None,
            status: Status::Stopped,
            cached_config: None,
            pending: None,
            deferred: Vec::new(),
        });
        Ok(())
    }

    /// Stop the machine if needed and drop it.
    pub fn unload(&mut self, player: &mut dyn PlaybackEngine) -> Result<()> {
        self.stop(player)?;
        self.machine = None;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.machine.is_some()
    }

    pub fn definition(&self) -> Option<&StateMachineDefinition> {
        self.machine.as_ref().map(|m| m.definition.as_ref())
    }

    pub fn status(&self) -> Status {
        self.machine.as_ref().map_or(Status::Stopped, |m| m.status)
    }

    pub fn current_state(&self) -> Option<&str> {
        let machine = self.machine.as_ref()?;
        let index = machine.current?;
        machine.definition.states.get(index).map(|s| s.name.as_str())
    }

    fn instance(&self) -> Result<&Instance> {
        self.machine
            .as_ref()
            .ok_or_else(|| StateMachineError::invalid_state("no state machine loaded"))
    }

    fn instance_mut(&mut self) -> Result<&mut Instance> {
        self.machine
            .as_mut()
            .ok_or_else(|| StateMachineError::invalid_state("no state machine loaded"))
    }

    // ----- lifecycle -----

    /// Stopped -> Running: enter the initial state. A running machine is left as is.
    pub fn start(&mut self, player: &mut dyn PlaybackEngine) -> Result<()> {
        let config = self.config;
        let machine = self.instance_mut()?;
        if machine.status != Status::Stopped {
            return Ok(());
        }
        let definition = Arc::clone(&machine.definition);
        let initial = definition.state_index(&definition.initial).ok_or_else(|| {
            StateMachineError::invalid_state(format!(
                "initial state '{}' missing from loaded definition",
                definition.initial
            ))
        })?;

        machine.cached_config = Some(player.config());
        if config.reset_triggers_on_start {
            machine.triggers.reset_all_silently();
        }
        machine.current = Some(initial);
        machine.status = Status::Running;
        log::debug!("state machine started in '{}'", definition.initial);

        let mut fired = Vec::new();
        let mut notices = Vec::new();
        enter(&definition, initial, machine, player, &mut fired, &mut notices);
        let mut outbox = vec![
            StateMachineEvent::Start,
            StateMachineEvent::StateEntered {
                state: definition.initial.clone(),
            },
        ];
        outbox.extend(notices);
        if definition.states[initial].is_final {
            finish(machine, &mut outbox);
        } else {
            drain(&definition, machine, player, config, fired, true, &mut outbox);
        }
        self.dispatch(outbox);
        Ok(())
    }

    /// Running/Paused -> Stopped. Restores the player config captured by `start`.
    /// Stopping a stopped machine does nothing.
    pub fn stop(&mut self, player: &mut dyn PlaybackEngine) -> Result<()> {
        let Some(machine) = self.machine.as_mut() else {
            return Ok(());
        };
        if machine.status == Status::Stopped {
            return Ok(());
        }
        let mut outbox = Vec::new();
        let exited = machine.abandon_tween(player);
        if let Some(state) = machine
            .current
            .and_then(|i| machine.definition.states.get(i))
            .filter(|_| !exited)
        {
            outbox.push(StateMachineEvent::StateExit {
                state: state.name.clone(),
            });
        }
        outbox.push(StateMachineEvent::Stop);
        machine.current = None;
        machine.status = Status::Stopped;
        if let Some(previous) = machine.cached_config.take() {
            if let Err(err) = player.set_config(previous) {
                log::warn!("could not restore player config: {err}");
            }
        }
        log::debug!("state machine stopped");
        self.dispatch(outbox);
        Ok(())
    }

    /// Running -> Paused. Ignored in any other status.
    pub fn pause(&mut self) -> Result<()> {
        let machine = self.instance_mut()?;
        if machine.status == Status::Running {
            machine.status = Status::Paused;
        }
        Ok(())
    }

    /// Paused -> Running. Ignored in any other status.
    pub fn resume(&mut self) -> Result<()> {
        let machine = self.instance_mut()?;
        if machine.status == Status::Paused {
            machine.status = Status::Running;
        }
        Ok(())
    }

    // ----- events -----

    /// Feed one event to the machine. Fails with `InvalidState` when the machine is
    /// stopped; a paused or tweening machine ignores the event and returns `Ok(false)`.
    ///
    /// Value-set events assign their trigger before transitions are evaluated; a bad
    /// assignment fails the call without touching the machine.
    pub fn post_event(&mut self, event: &Event, player: &mut dyn PlaybackEngine) -> Result<bool> {
        let config = self.config;
        let machine = self.instance_mut()?;
        match machine.status {
            Status::Stopped => {
                return Err(StateMachineError::invalid_state(
                    "cannot post an event to a stopped state machine",
                ))
            }
            Status::Paused => return Ok(false),
            Status::Tweening => {
                log::debug!("{} ignored while tweening", event.tag());
                return Ok(false);
            }
            Status::Running => {}
        }
        if let Some((name, value)) = event.assignment() {
            machine.triggers.set(name, value)?;
        }
        let definition = Arc::clone(&machine.definition);
        let mut outbox = Vec::new();
        let transitioned = drain(
            &definition,
            machine,
            player,
            config,
            vec![event.clone()],
            false,
            &mut outbox,
        );
        self.dispatch(outbox);
        Ok(transitioned)
    }

    /// Force the current state without evaluating guards. `do_tick` also applies the
    /// target's playback settings and entry actions. A tween in flight is abandoned.
    pub fn override_current_state(
        &mut self,
        state: &str,
        do_tick: bool,
        player: &mut dyn PlaybackEngine,
    ) -> Result<()> {
        let config = self.config;
        let machine = self.instance_mut()?;
        if machine.status == Status::Stopped {
            return Err(StateMachineError::invalid_state(
                "cannot override the state of a stopped state machine",
            ));
        }
        let definition = Arc::clone(&machine.definition);
        let target = definition
            .state_index(state)
            .ok_or_else(|| StateMachineError::not_found("state", state))?;

        let mut outbox = Vec::new();
        let exited = machine.abandon_tween(player);
        if let Some(previous) = machine
            .current
            .and_then(|i| definition.states.get(i))
            .filter(|_| !exited)
        {
            outbox.push(StateMachineEvent::StateExit {
                state: previous.name.clone(),
            });
        }
        machine.current = Some(target);
        log::debug!("state overridden to '{state}'");

        let mut fired = Vec::new();
        let mut notices = Vec::new();
        if do_tick {
            enter(&definition, target, machine, player, &mut fired, &mut notices);
        }
        outbox.push(StateMachineEvent::StateEntered {
            state: state.to_string(),
        });
        outbox.extend(notices);
        drain(&definition, machine, player, config, fired, true, &mut outbox);
        self.dispatch(outbox);
        Ok(())
    }

    /// Enter the target of the tweened transition in flight, then process the events
    /// queued behind it. Returns `false` when no tween was pending.
    pub fn complete_tween(&mut self, player: &mut dyn PlaybackEngine) -> bool {
        let config = self.config;
        let Some(machine) = self.machine.as_mut() else {
            return false;
        };
        if machine.status != Status::Tweening {
            return false;
        }
        machine.status = Status::Running;
        let Some(target) = machine.pending.take() else {
            debug_assert!(false, "tweening without a target");
            return false;
        };
        let definition = Arc::clone(&machine.definition);
        let state = &definition.states[target];
        machine.current = Some(target);
        log::debug!("tween finished, entering '{}'", state.name);

        let mut fired = Vec::new();
        let mut notices = Vec::new();
        enter(&definition, target, machine, player, &mut fired, &mut notices);
        let mut outbox = vec![StateMachineEvent::StateEntered {
            state: state.name.clone(),
        }];
        outbox.extend(notices);
        if state.is_final {
            machine.deferred.clear();
            finish(machine, &mut outbox);
        } else {
            let mut queued = std::mem::take(&mut machine.deferred);
            queued.extend(fired);
            drain(&definition, machine, player, config, queued, true, &mut outbox);
        }
        self.dispatch(outbox);
        true
    }

    // ----- triggers -----

    /// Assign a trigger outside of event processing. Returns whether it changed.
    pub fn set_trigger(&mut self, name: &str, value: TriggerValue) -> Result<bool> {
        let machine = self.instance_mut()?;
        let changed = machine.triggers.set(name, value)?;
        let outbox = machine.triggers.take_notifications();
        self.dispatch(outbox);
        Ok(changed)
    }

    pub fn get_trigger(&self, name: &str) -> Result<TriggerValue> {
        self.instance()?.triggers.get(name).cloned()
    }

    pub fn reset_trigger(&mut self, name: &str) -> Result<bool> {
        let machine = self.instance_mut()?;
        let changed = machine.triggers.reset(name)?;
        let outbox = machine.triggers.take_notifications();
        self.dispatch(outbox);
        Ok(changed)
    }

    pub fn triggers(&self) -> Option<&TriggerStore> {
        self.machine.as_ref().map(|m| &m.triggers)
    }

    fn dispatch(&self, outbox: Vec<StateMachineEvent>) {
        for event in &outbox {
            log::trace!("state machine notification: {}", event.name());
            self.observers.emit(event);
        }
    }
}

impl StateMachine for StateMachineEngine {
    fn load(&mut self, json: &str, player: &mut dyn PlaybackEngine) -> Result<()> {
        StateMachineEngine::load(self, json, player)
    }

    fn start(&mut self, player: &mut dyn PlaybackEngine) -> Result<()> {
        StateMachineEngine::start(self, player)
    }

    fn stop(&mut self, player: &mut dyn PlaybackEngine) -> Result<()> {
        StateMachineEngine::stop(self, player)
    }

    fn post_event(&mut self, event: &Event, player: &mut dyn PlaybackEngine) -> Result<bool> {
        StateMachineEngine::post_event(self, event, player)
    }

    fn set_trigger(&mut self, name: &str, value: TriggerValue) -> Result<bool> {
        StateMachineEngine::set_trigger(self, name, value)
    }

    fn get_trigger(&self, name: &str) -> Result<TriggerValue> {
        StateMachineEngine::get_trigger(self, name)
    }

    fn override_current_state(
        &mut self,
        state: &str,
        do_tick: bool,
        player: &mut dyn PlaybackEngine,
    ) -> Result<()> {
        StateMachineEngine::override_current_state(self, state, do_tick, player)
    }

    fn current_state(&self) -> Option<&str> {
        StateMachineEngine::current_state(self)
    }
}

/// Process `initial` breadth-first. Events fired by actions join the back of the queue
/// until `max_queued_events` synthetic events have been accepted. `synthetic` marks
/// `initial` itself as fired by actions rather than posted by the host.
fn drain(
    definition: &StateMachineDefinition,
    machine: &mut Instance,
    player: &mut dyn PlaybackEngine,
    config: StateMachineConfig,
    initial: Vec<Event>,
    synthetic: bool,
    outbox: &mut Vec<StateMachineEvent>,
) -> bool {
    let mut queue = VecDeque::new();
    let mut accepted = 0usize;
    let mut dropped = 0usize;
    let mut admit = |queue: &mut VecDeque<Event>, events: Vec<Event>, synthetic: bool| {
        for event in events {
            if synthetic {
                if accepted >= config.max_queued_events {
                    dropped += 1;
                    continue;
                }
                accepted += 1;
            }
            queue.push_back(event);
        }
    };
    admit(&mut queue, initial, synthetic);

    let mut transitioned = false;
    while let Some(event) = queue.pop_front() {
        match machine.status {
            Status::Running => {}
            Status::Tweening => {
                machine.deferred.push(event);
                machine.deferred.extend(queue.drain(..));
                break;
            }
            Status::Stopped | Status::Paused => break,
        }
        let mut fired = Vec::new();
        transitioned |= step(definition, machine, player, &event, &mut fired, outbox);
        admit(&mut queue, fired, true);
    }
    if dropped > 0 {
        log::warn!("discarded {dropped} synthetic events beyond the queue bound");
        outbox.push(StateMachineEvent::Error {
            message: format!(
                "discarded {dropped} synthetic events beyond the limit of {}",
                config.max_queued_events
            ),
        });
    }
    transitioned
}

/// Guarded transitions in declaration order first; the guardless one only when none holds.
fn select<'a>(
    transitions: &'a [Transition],
    triggers: &TriggerStore,
    tag: &str,
) -> Option<&'a Transition> {
    transitions
        .iter()
        .filter(|t| !t.guards.is_empty())
        .find(|t| all_hold(&t.guards, triggers, Some(tag)))
        .or_else(|| transitions.iter().find(|t| t.guards.is_empty()))
}

/// Run interactions for `event`, then fire the first transition that applies. Global
/// transitions are tried first; one leading back to the current state is skipped.
fn step(
    definition: &StateMachineDefinition,
    machine: &mut Instance,
    player: &mut dyn PlaybackEngine,
    event: &Event,
    fired: &mut Vec<Event>,
    outbox: &mut Vec<StateMachineEvent>,
) -> bool {
    let Some(current) = machine.current else {
        return false;
    };
    let state = &definition.states[current];
    let mut notices = machine.triggers.take_notifications();

    for interaction in definition
        .interactions
        .iter()
        .filter(|i| i.matches(event, &state.name))
    {
        run_actions(interaction.actions(), machine, player, fired, &mut notices);
    }

    let tag = event.tag();
    let global = definition
        .global
        .as_ref()
        .and_then(|g| select(&g.transitions, &machine.triggers, tag))
        .filter(|t| t.to_state != state.name);
    let Some(transition) = global.or_else(|| select(&state.transitions, &machine.triggers, tag))
    else {
        outbox.extend(notices);
        return false;
    };
    let Some(next) = definition.state_index(&transition.to_state) else {
        debug_assert!(false, "validated target '{}' missing", transition.to_state);
        outbox.extend(notices);
        return false;
    };

    run_actions(&state.exit_actions, machine, player, fired, &mut notices);
    run_actions(&transition.actions, machine, player, fired, &mut notices);

    let target = &definition.states[next];
    outbox.push(StateMachineEvent::StateExit {
        state: state.name.clone(),
    });
    outbox.push(StateMachineEvent::Transition {
        previous_state: state.name.clone(),
        new_state: target.name.clone(),
    });

    if transition.is_tweened() {
        match begin_tween(transition, target, player) {
            Ok(true) => {
                log::debug!("tweening '{}' -> '{}' on {tag}", state.name, target.name);
                machine.pending = Some(next);
                machine.status = Status::Tweening;
                outbox.extend(notices);
                return true;
            }
            Ok(false) => {}
            Err(err) => {
                log::warn!("tween to '{}' not started: {err}", target.name);
                notices.push(StateMachineEvent::Error {
                    message: err.to_string(),
                });
            }
        }
    }

    machine.current = Some(next);
    enter(definition, next, machine, player, fired, &mut notices);
    log::debug!("transition '{}' -> '{}' on {tag}", state.name, target.name);
    outbox.push(StateMachineEvent::StateEntered {
        state: target.name.clone(),
    });
    outbox.extend(notices);
    if target.is_final {
        finish(machine, outbox);
    }
    true
}

/// Glide toward `target`'s marker, or its segment start. `Ok(false)` when the target
/// names no position in the active animation, in which case it is entered directly.
fn begin_tween(
    transition: &Transition,
    target: &State,
    player: &mut dyn PlaybackEngine,
) -> kinema_player_core::Result<bool> {
    let (Some(duration), Some(settings)) = (transition.duration, target.playback.as_ref()) else {
        return Ok(false);
    };
    if let Some(id) = settings.animation.as_deref() {
        if player.active_animation_id().as_deref() != Some(id) {
            return Ok(false);
        }
    }
    if let Some(marker) = settings.marker.as_deref() {
        player.tween_to_marker(marker, duration, transition.easing)?;
    } else if let Some((start, _)) = settings.segment {
        player.tween_to(start, duration, transition.easing)?;
    } else {
        return Ok(false);
    }
    Ok(true)
}

/// Apply a state's playback settings and run its entry actions.
fn enter(
    definition: &StateMachineDefinition,
    index: usize,
    machine: &mut Instance,
    player: &mut dyn PlaybackEngine,
    fired: &mut Vec<Event>,
    notices: &mut Vec<StateMachineEvent>,
) {
    let state = &definition.states[index];
    if let Some(settings) = &state.playback {
        if let Err(err) = apply_playback(settings, player) {
            log::warn!("state '{}': playback settings not applied: {err}", state.name);
            notices.push(StateMachineEvent::Error {
                message: err.to_string(),
            });
        }
    }
    run_actions(&state.entry_actions, machine, player, fired, notices);
}

fn apply_playback(
    settings: &PlaybackSettings,
    player: &mut dyn PlaybackEngine,
) -> kinema_player_core::Result<()> {
    let config = settings.to_config(&player.config());
    let autoplay = config.autoplay;
    player.set_config(config)?;
    match settings.animation.as_deref() {
        Some(id) if player.active_animation_id().as_deref() != Some(id) => {
            player.load_animation_by_id(id)
        }
        _ if player.is_loaded() => {
            player.stop()?;
            if autoplay {
                player.play()?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Actions are fail-soft: a failure is logged and reported, the rest still run.
fn run_actions(
    actions: &[Action],
    machine: &mut Instance,
    player: &mut dyn PlaybackEngine,
    fired: &mut Vec<Event>,
    notices: &mut Vec<StateMachineEvent>,
) {
    for action in actions {
        let mut ctx = ActionContext {
            triggers: &mut machine.triggers,
            player: &mut *player,
            fired: &mut *fired,
            notices: &mut *notices,
        };
        if let Err(err) = action.execute(&mut ctx) {
            log::warn!("action {action:?} failed: {err}");
            notices.push(StateMachineEvent::Error {
                message: err.to_string(),
            });
        }
    }
}

/// A final state was entered: the machine stops where it is.
fn finish(machine: &mut Instance, outbox: &mut Vec<StateMachineEvent>) {
    machine.current = None;
    machine.pending = None;
    machine.status = Status::Stopped;
    machine.cached_config = None;
    log::debug!("final state reached, state machine stopped");
    outbox.push(StateMachineEvent::Stop);
}
