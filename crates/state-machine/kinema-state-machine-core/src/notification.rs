//! State-machine notifications delivered through the observer bus.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
#[non_exhaustive]
pub enum StateMachineEvent {
    Start,
    Stop,
    Transition {
        previous_state: String,
        new_state: String,
    },
    StateEntered {
        state: String,
    },
    StateExit {
        state: String,
    },
    BooleanTriggerValueChange {
        name: String,
        old_value: bool,
        new_value: bool,
    },
    NumericTriggerValueChange {
        name: String,
        old_value: f32,
        new_value: f32,
    },
    StringTriggerValueChange {
        name: String,
        old_value: String,
        new_value: String,
    },
    TriggerFired {
        name: String,
    },
    CustomEvent {
        message: String,
    },
    Error {
        message: String,
    },
}

impl StateMachineEvent {
    /// Short name, handy for logs and test assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Transition { .. } => "transition",
            Self::StateEntered { .. } => "state_entered",
            Self::StateExit { .. } => "state_exit",
            Self::BooleanTriggerValueChange { .. } => "boolean_trigger_value_change",
            Self::NumericTriggerValueChange { .. } => "numeric_trigger_value_change",
            Self::StringTriggerValueChange { .. } => "string_trigger_value_change",
            Self::TriggerFired { .. } => "trigger_fired",
            Self::CustomEvent { .. } => "custom_event",
            Self::Error { .. } => "error",
        }
    }
}
