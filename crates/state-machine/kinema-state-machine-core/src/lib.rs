//! Kinema state machines.
//!
//! A definition document declares typed triggers, states with playback settings, and
//! guarded transitions. The [`StateMachineEngine`] runs one definition against any
//! [`PlaybackEngine`](kinema_player_core::PlaybackEngine), evaluating guards when
//! events are posted and reporting every step through an ordered observer bus.

pub mod action;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod notification;
pub mod trigger;

pub use action::Action;
pub use config::StateMachineConfig;
pub use definition::{
    GlobalState, Interaction, PlaybackSettings, State, StateMachineDefinition, Transition,
    TriggerDecl,
};
pub use engine::{StateMachine, StateMachineEngine, Status};
pub use error::{Result, StateMachineError};
pub use event::Event;
pub use guard::{BoolOrRef, ConditionType, Guard, NumberOrRef};
pub use notification::StateMachineEvent;
pub use trigger::{TriggerKind, TriggerStore, TriggerValue};
