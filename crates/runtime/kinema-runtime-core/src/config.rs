use kinema_player_core::PlaybackConfig;
use kinema_state_machine_core::StateMachineConfig;
use serde::{Deserialize, Serialize};

/// Everything a [`Runtime`](crate::Runtime) is built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Initial player configuration.
    pub playback: PlaybackConfig,
    pub state_machine: StateMachineConfig,
    /// Post player completion and loops to a running machine as events.
    pub forward_playback_events: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            state_machine: StateMachineConfig::default(),
            forward_playback_events: true,
        }
    }
}
