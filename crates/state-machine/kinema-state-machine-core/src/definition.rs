//! State-machine documents: parsing and graph validation.
//!
//! A definition is immutable once validated; the engine shares it behind an `Arc`.

use hashbrown::{HashMap, HashSet};
use kinema_player_core::{Mode, PlaybackConfig};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{Result, StateMachineError};
use crate::event::Event;
use crate::guard::{reference, BoolOrRef, Guard, NumberOrRef};
use crate::trigger::{TriggerKind, TriggerStore, TriggerValue};

/// Declared trigger with its default value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerDecl {
    Boolean { name: String, value: bool },
    Numeric { name: String, value: f32 },
    String { name: String, value: String },
}

impl TriggerDecl {
    pub fn name(&self) -> &str {
        match self {
            TriggerDecl::Boolean { name, .. }
            | TriggerDecl::Numeric { name, .. }
            | TriggerDecl::String { name, .. } => name,
        }
    }

    pub fn default_value(&self) -> TriggerValue {
        match self {
            TriggerDecl::Boolean { value, .. } => TriggerValue::Boolean(*value),
            TriggerDecl::Numeric { value, .. } => TriggerValue::Numeric(*value),
            TriggerDecl::String { value, .. } => TriggerValue::String(value.clone()),
        }
    }
}

/// Playback applied when a state is entered. Unset fields take `PlaybackConfig` defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Library id of the animation to show.
    #[serde(default)]
    pub animation: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default, rename = "loop")]
    pub loop_animation: Option<bool>,
    #[serde(default)]
    pub loop_count: Option<u32>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub segment: Option<(f32, f32)>,
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub autoplay: Option<bool>,
}

impl PlaybackSettings {
    /// Fresh config for this state. Only frame interpolation is carried over.
    pub fn to_config(&self, current: &PlaybackConfig) -> PlaybackConfig {
        let defaults = PlaybackConfig::default();
        PlaybackConfig {
            mode: self.mode.unwrap_or(defaults.mode),
            loop_animation: self.loop_animation.unwrap_or(defaults.loop_animation),
            loop_count: self.loop_count.unwrap_or(defaults.loop_count),
            speed: self.speed.unwrap_or(defaults.speed),
            segment: self.segment,
            use_frame_interpolation: current.use_frame_interpolation,
            marker: self.marker.clone(),
            autoplay: self.autoplay.unwrap_or(defaults.autoplay),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub to_state: String,
    #[serde(default)]
    pub guards: Vec<Guard>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Tween length in milliseconds. When set, the player glides to the target
    /// state's marker (or segment start) before the target is entered.
    #[serde(default)]
    pub duration: Option<f32>,
    /// Cubic-bezier `[x1, y1, x2, y2]` for the tween; linear when unset.
    #[serde(default)]
    pub easing: Option<[f32; 4]>,
}

impl Transition {
    pub fn is_tweened(&self) -> bool {
        self.duration.is_some()
    }
}

/// Transitions reachable from every state, tried before the current state's own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub name: String,
    #[serde(default)]
    pub playback: Option<PlaybackSettings>,
    #[serde(default)]
    pub entry_actions: Vec<Action>,
    #[serde(default)]
    pub exit_actions: Vec<Action>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Entering this state stops the machine.
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// Actions run when a matching event is posted, before transitions are evaluated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Interaction {
    PointerDown { actions: Vec<Action> },
    PointerUp { actions: Vec<Action> },
    PointerMove { actions: Vec<Action> },
    PointerEnter { actions: Vec<Action> },
    PointerExit { actions: Vec<Action> },
    Click { actions: Vec<Action> },
    /// Optionally limited to one state.
    #[serde(rename = "Complete")]
    OnComplete {
        #[serde(default)]
        state_name: Option<String>,
        actions: Vec<Action>,
    },
    #[serde(rename = "LoopComplete")]
    OnLoopComplete {
        #[serde(default)]
        state_name: Option<String>,
        actions: Vec<Action>,
    },
}

impl Interaction {
    pub fn actions(&self) -> &[Action] {
        match self {
            Interaction::PointerDown { actions }
            | Interaction::PointerUp { actions }
            | Interaction::PointerMove { actions }
            | Interaction::PointerEnter { actions }
            | Interaction::PointerExit { actions }
            | Interaction::Click { actions }
            | Interaction::OnComplete { actions, .. }
            | Interaction::OnLoopComplete { actions, .. } => actions,
        }
    }

    pub fn matches(&self, event: &Event, current_state: &str) -> bool {
        let scoped = |state_name: &Option<String>| {
            state_name.as_deref().map_or(true, |s| s == current_state)
        };
        match (self, event) {
            (Interaction::PointerDown { .. }, Event::PointerDown { .. })
            | (Interaction::PointerUp { .. }, Event::PointerUp { .. })
            | (Interaction::PointerMove { .. }, Event::PointerMove { .. })
            | (Interaction::PointerEnter { .. }, Event::PointerEnter { .. })
            | (Interaction::PointerExit { .. }, Event::PointerExit { .. })
            | (Interaction::Click { .. }, Event::Click { .. }) => true,
            (Interaction::OnComplete { state_name, .. }, Event::Complete)
            | (Interaction::OnLoopComplete { state_name, .. }, Event::LoopComplete) => {
                scoped(state_name)
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineDefinition {
    pub initial: String,
    #[serde(default)]
    pub triggers: Vec<TriggerDecl>,
    pub states: Vec<State>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub global: Option<GlobalState>,
}

impl StateMachineDefinition {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: Self = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// Trigger store holding every declared trigger at its default.
    pub fn trigger_store(&self) -> Result<TriggerStore> {
        let mut store = TriggerStore::new();
        for decl in &self.triggers {
            store.declare(decl.name(), decl.default_value())?;
        }
        Ok(store)
    }

    /// Check the graph: unique names, resolvable targets and trigger references,
    /// at most one guardless transition per state, sane playback settings.
    pub fn validate(&self) -> Result<()> {
        let mut kinds: HashMap<&str, TriggerKind> = HashMap::new();
        for decl in &self.triggers {
            if Event::is_builtin_tag(decl.name()) {
                return Err(StateMachineError::validation(format!(
                    "trigger '{}' shadows a built-in event",
                    decl.name()
                )));
            }
            let kind = decl.default_value().kind();
            if kinds.insert(decl.name(), kind).is_some() {
                return Err(StateMachineError::validation(format!(
                    "duplicate trigger '{}'",
                    decl.name()
                )));
            }
        }

        let mut names = HashSet::new();
        for state in &self.states {
            if !names.insert(state.name.as_str()) {
                return Err(StateMachineError::validation(format!(
                    "duplicate state '{}'",
                    state.name
                )));
            }
        }
        if !names.contains(self.initial.as_str()) {
            return Err(StateMachineError::validation(format!(
                "initial state '{}' does not exist",
                self.initial
            )));
        }

        let check = Checker {
            kinds: &kinds,
            states: &names,
        };
        for state in &self.states {
            let ctx = format!("state '{}'", state.name);
            if let Some(playback) = &state.playback {
                check_playback(&ctx, playback)?;
            }
            check.actions(&ctx, &state.entry_actions)?;
            check.actions(&ctx, &state.exit_actions)?;
            check.transitions(&ctx, &state.transitions)?;
        }
        if let Some(global) = &self.global {
            check.transitions("global state", &global.transitions)?;
        }

        for interaction in &self.interactions {
            if let Interaction::OnComplete {
                state_name: Some(s),
                ..
            }
            | Interaction::OnLoopComplete {
                state_name: Some(s),
                ..
            } = interaction
            {
                if !names.contains(s.as_str()) {
                    return Err(StateMachineError::validation(format!(
                        "interaction scoped to unknown state '{s}'"
                    )));
                }
            }
            check.actions("interaction", interaction.actions())?;
        }
        Ok(())
    }
}

fn check_playback(ctx: &str, playback: &PlaybackSettings) -> Result<()> {
    if let Some(speed) = playback.speed {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(StateMachineError::validation(format!(
                "{ctx}: speed must be > 0, got {speed}"
            )));
        }
    }
    if let Some((start, end)) = playback.segment {
        if start < 0.0 || start >= end {
            return Err(StateMachineError::validation(format!(
                "{ctx}: segment [{start}, {end}] must satisfy 0 <= start < end"
            )));
        }
    }
    Ok(())
}

fn check_tween(ctx: &str, transition: &Transition) -> Result<()> {
    if let Some(duration) = transition.duration {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(StateMachineError::validation(format!(
                "{ctx}: tween to '{}' needs a duration > 0, got {duration}",
                transition.to_state
            )));
        }
    }
    if let Some(easing) = transition.easing {
        let [x1, _, x2, _] = easing;
        if easing.iter().any(|v| !v.is_finite())
            || !(0.0..=1.0).contains(&x1)
            || !(0.0..=1.0).contains(&x2)
        {
            return Err(StateMachineError::validation(format!(
                "{ctx}: easing {easing:?} needs finite values with x1, x2 in [0, 1]"
            )));
        }
    }
    Ok(())
}

struct Checker<'a> {
    kinds: &'a HashMap<&'a str, TriggerKind>,
    states: &'a HashSet<&'a str>,
}

impl Checker<'_> {
    fn transitions(&self, ctx: &str, transitions: &[Transition]) -> Result<()> {
        let mut guardless = 0;
        for transition in transitions {
            if !self.states.contains(transition.to_state.as_str()) {
                return Err(StateMachineError::validation(format!(
                    "{ctx}: transition target '{}' does not exist",
                    transition.to_state
                )));
            }
            if transition.guards.is_empty() {
                guardless += 1;
            }
            for guard in &transition.guards {
                self.guard(ctx, guard)?;
            }
            self.actions(ctx, &transition.actions)?;
            check_tween(ctx, transition)?;
        }
        if guardless > 1 {
            return Err(StateMachineError::validation(format!(
                "{ctx}: more than one transition without guards"
            )));
        }
        Ok(())
    }

    fn require(&self, ctx: &str, name: &str, kind: TriggerKind) -> Result<()> {
        match self.kinds.get(name) {
            Some(k) if *k == kind => Ok(()),
            Some(k) => Err(StateMachineError::validation(format!(
                "{ctx}: trigger '{name}' is {k:?}, expected {kind:?}"
            ))),
            None => Err(StateMachineError::validation(format!(
                "{ctx}: unknown trigger '{name}'"
            ))),
        }
    }

    fn reference(&self, ctx: &str, raw: &str, kind: TriggerKind) -> Result<()> {
        match reference(raw) {
            Some(name) => self.require(ctx, name, kind),
            None => Err(StateMachineError::validation(format!(
                "{ctx}: '{raw}' is not a $trigger reference"
            ))),
        }
    }

    fn number(&self, ctx: &str, value: &NumberOrRef) -> Result<()> {
        match value {
            NumberOrRef::Number(_) => Ok(()),
            NumberOrRef::Ref(raw) => self.reference(ctx, raw, TriggerKind::Numeric),
        }
    }

    fn guard(&self, ctx: &str, guard: &Guard) -> Result<()> {
        match guard {
            Guard::Numeric {
                trigger_name,
                compare_to,
                ..
            } => {
                self.require(ctx, trigger_name, TriggerKind::Numeric)?;
                self.number(ctx, compare_to)
            }
            Guard::String {
                trigger_name,
                condition_type,
                compare_to,
            } => {
                if condition_type.is_ordering() {
                    return Err(StateMachineError::validation(format!(
                        "{ctx}: {condition_type:?} is not allowed on string trigger '{trigger_name}'"
                    )));
                }
                self.require(ctx, trigger_name, TriggerKind::String)?;
                match reference(compare_to) {
                    Some(other) => self.require(ctx, other, TriggerKind::String),
                    None => Ok(()),
                }
            }
            Guard::Boolean {
                trigger_name,
                condition_type,
                compare_to,
            } => {
                if condition_type.is_ordering() {
                    return Err(StateMachineError::validation(format!(
                        "{ctx}: {condition_type:?} is not allowed on boolean trigger '{trigger_name}'"
                    )));
                }
                self.require(ctx, trigger_name, TriggerKind::Boolean)?;
                match compare_to {
                    BoolOrRef::Bool(_) => Ok(()),
                    BoolOrRef::Ref(raw) => self.reference(ctx, raw, TriggerKind::Boolean),
                }
            }
            Guard::Event { event_name } => {
                if event_name.is_empty() {
                    return Err(StateMachineError::validation(format!(
                        "{ctx}: event guard with empty name"
                    )));
                }
                Ok(())
            }
        }
    }

    fn actions(&self, ctx: &str, actions: &[Action]) -> Result<()> {
        for action in actions {
            if let Some((name, kind)) = action.trigger_ref() {
                self.require(ctx, name, kind)?;
            }
            if let Some(name) = action.reset_target() {
                if !self.kinds.contains_key(name) {
                    return Err(StateMachineError::validation(format!(
                        "{ctx}: unknown trigger '{name}'"
                    )));
                }
            }
            if let Some(operand) = action.operand() {
                self.number(ctx, operand)?;
            }
        }
        Ok(())
    }
}
