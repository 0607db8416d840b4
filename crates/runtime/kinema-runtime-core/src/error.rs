//! Runtime errors and the codes reported across the call surface.

use kinema_player_core::PlayerError;
use kinema_state_machine_core::StateMachineError;
use serde::{Deserialize, Serialize};

/// Stable, serializable error code for hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    InvalidState,
    NotFound,
    TypeMismatch,
    ValidationError,
    InvalidConfig,
    DecodeError,
    ResourceNotFound,
    RenderError,
    Internal,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error(transparent)]
    Player(#[from] PlayerError),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    /// The request itself could not be understood.
    #[error("Bad request: {reason}")]
    Request { reason: String },
}

impl RuntimeError {
    pub fn request(reason: impl Into<String>) -> Self {
        Self::Request {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Player(err) => player_code(err),
            Self::StateMachine(err) => match err {
                StateMachineError::Parse { .. } | StateMachineError::Validation { .. } => {
                    ErrorCode::ValidationError
                }
                StateMachineError::InvalidState { .. } => ErrorCode::InvalidState,
                StateMachineError::NotFound { .. } => ErrorCode::NotFound,
                StateMachineError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
                StateMachineError::Player(inner) => player_code(inner),
                _ => ErrorCode::Internal,
            },
            Self::Request { .. } => ErrorCode::ValidationError,
        }
    }
}

fn player_code(err: &PlayerError) -> ErrorCode {
    match err {
        PlayerError::InvalidState { .. } => ErrorCode::InvalidState,
        PlayerError::NotFound { .. } => ErrorCode::NotFound,
        PlayerError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        PlayerError::Decode { .. } => ErrorCode::DecodeError,
        PlayerError::ResourceNotFound { .. } => ErrorCode::ResourceNotFound,
        PlayerError::Render { .. } => ErrorCode::RenderError,
        _ => ErrorCode::Internal,
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
