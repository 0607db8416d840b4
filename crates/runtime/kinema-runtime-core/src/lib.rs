//! kinema-runtime
//!
//! Wires a [`Player`](kinema_player_core::Player) to a
//! [`StateMachineEngine`](kinema_state_machine_core::StateMachineEngine): the runtime
//! owns both, forwards playback completion into the machine, and serves a JSON
//! request/response surface for hosts.

pub mod api;
pub mod config;
pub mod error;
pub mod runtime;

pub use crate::api::{ErrorBody, Request, Response, RuntimeStatus};
pub use crate::config::RuntimeConfig;
pub use crate::error::{ErrorCode, Result, RuntimeError};
pub use crate::runtime::Runtime;

pub use kinema_player_core as player;
pub use kinema_state_machine_core as state_machine;
