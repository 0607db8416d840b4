//! Error types for the playback core.

use serde::{Deserialize, Serialize};

/// Errors raised by playback, tweening and collaborator calls.
///
/// A failed operation never leaves the player half-updated: every variant is
/// returned before any state is touched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PlayerError {
    /// Operation not valid in the current lifecycle phase.
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    /// Unknown marker (or other named item) requested by the caller.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// Rejected configuration value.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// The animation decoder could not produce an animation.
    #[error("Decode error: {reason}")]
    Decode { reason: String },

    /// An animation id unknown to the library.
    #[error("Resource not found: {id}")]
    ResourceNotFound { id: String },

    /// Rasterizer failure while painting a frame.
    #[error("Render error: {reason}")]
    Render { reason: String },
}

impl PlayerError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Get error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "state",
            Self::NotFound { .. } => "lookup",
            Self::InvalidConfig { .. } => "validation",
            Self::Decode { .. } => "decode",
            Self::ResourceNotFound { .. } => "resource",
            Self::Render { .. } => "render",
        }
    }

    /// Errors the host can fix by retrying with different input.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::NotFound { .. } | Self::InvalidConfig { .. }
        )
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_lookup_and_state() {
        assert_eq!(PlayerError::not_found("marker", "intro").category(), "lookup");
        assert_eq!(PlayerError::invalid_state("no animation").category(), "state");
        assert_eq!(
            PlayerError::ResourceNotFound { id: "a".into() }.category(),
            "resource"
        );
    }

    #[test]
    fn decode_failures_are_not_recoverable() {
        let err: PlayerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PlayerError::Decode { .. }));
        assert!(!err.is_recoverable());
        assert!(PlayerError::invalid_config("speed").is_recoverable());
    }

    #[test]
    fn display_names_the_missing_item() {
        let err = PlayerError::not_found("marker", "outro");
        assert_eq!(err.to_string(), "marker not found: outro");
    }
}
