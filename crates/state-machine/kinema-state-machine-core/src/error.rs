//! Error types for the state-machine engine.

use kinema_player_core::PlayerError;
use serde::{Deserialize, Serialize};

use crate::trigger::TriggerKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StateMachineError {
    /// Definition text is not a well-formed document.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// Definition parsed but describes an invalid graph.
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    /// Operation not valid in the current lifecycle phase.
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    /// Unknown trigger or state.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// Trigger set with a value of the wrong kind.
    #[error("Type mismatch for trigger '{name}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: TriggerKind,
        actual: TriggerKind,
    },

    /// Failure reported by the player while applying a state.
    #[error(transparent)]
    Player(#[from] PlayerError),
}

impl StateMachineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Parse { .. } | Self::Validation { .. } => "definition",
            Self::InvalidState { .. } => "state",
            Self::NotFound { .. } => "lookup",
            Self::TypeMismatch { .. } => "trigger",
            Self::Player(_) => "player",
        }
    }
}

impl From<serde_json::Error> for StateMachineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StateMachineError>;
