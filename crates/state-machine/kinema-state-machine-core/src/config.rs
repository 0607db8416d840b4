use serde::{Deserialize, Serialize};

/// Engine limits and start-up policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateMachineConfig {
    /// Synthetic events drained per posted event before the rest are discarded.
    pub max_queued_events: usize,
    /// Return every trigger to its declared default on `start`.
    pub reset_triggers_on_start: bool,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            max_queued_events: 20,
            reset_triggers_on_start: true,
        }
    }
}
