//! Named, typed variables read by guards and written by the host or by actions.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StateMachineError};
use crate::notification::StateMachineEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    Boolean,
    Numeric,
    String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerValue {
    Boolean(bool),
    Numeric(f32),
    String(String),
}

impl TriggerValue {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerValue::Boolean(_) => TriggerKind::Boolean,
            TriggerValue::Numeric(_) => TriggerKind::Numeric,
            TriggerValue::String(_) => TriggerKind::String,
        }
    }
}

impl From<bool> for TriggerValue {
    fn from(v: bool) -> Self {
        TriggerValue::Boolean(v)
    }
}

impl From<f32> for TriggerValue {
    fn from(v: f32) -> Self {
        TriggerValue::Numeric(v)
    }
}

impl From<&str> for TriggerValue {
    fn from(v: &str) -> Self {
        TriggerValue::String(v.to_string())
    }
}

impl From<String> for TriggerValue {
    fn from(v: String) -> Self {
        TriggerValue::String(v)
    }
}

#[derive(Clone, Debug)]
struct Slot {
    default: TriggerValue,
    value: TriggerValue,
}

/// Trigger values of one state-machine instance.
///
/// Every effective change queues a typed value-change notification followed by a
/// `TriggerFired`; the engine drains them once the surrounding evaluation is done.
#[derive(Clone, Debug, Default)]
pub struct TriggerStore {
    slots: HashMap<String, Slot>,
    pending: Vec<StateMachineEvent>,
}

impl TriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger with its default value. Names are unique.
    pub fn declare(&mut self, name: impl Into<String>, default: TriggerValue) -> Result<()> {
        let name = name.into();
        if self.slots.contains_key(&name) {
            return Err(StateMachineError::validation(format!(
                "duplicate trigger '{name}'"
            )));
        }
        self.slots.insert(
            name,
            Slot {
                value: default.clone(),
                default,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&TriggerValue> {
        self.slots
            .get(name)
            .map(|s| &s.value)
            .ok_or_else(|| StateMachineError::not_found("trigger", name))
    }

    pub fn kind(&self, name: &str) -> Option<TriggerKind> {
        self.slots.get(name).map(|s| s.default.kind())
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.slots.get(name)?.value {
            TriggerValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn numeric(&self, name: &str) -> Option<f32> {
        match self.slots.get(name)?.value {
            TriggerValue::Numeric(n) => Some(n),
            _ => None,
        }
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match &self.slots.get(name)?.value {
            TriggerValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Set a value of the declared kind. Returns whether the value changed.
    pub fn set(&mut self, name: &str, value: TriggerValue) -> Result<bool> {
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| StateMachineError::not_found("trigger", name))?;
        let expected = slot.default.kind();
        if value.kind() != expected {
            return Err(StateMachineError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual: value.kind(),
            });
        }
        if slot.value == value {
            return Ok(false);
        }
        let old = std::mem::replace(&mut slot.value, value);
        let change = match (old, &slot.value) {
            (TriggerValue::Boolean(old_value), TriggerValue::Boolean(new_value)) => {
                Some(StateMachineEvent::BooleanTriggerValueChange {
                    name: name.to_string(),
                    old_value,
                    new_value: *new_value,
                })
            }
            (TriggerValue::Numeric(old_value), TriggerValue::Numeric(new_value)) => {
                Some(StateMachineEvent::NumericTriggerValueChange {
                    name: name.to_string(),
                    old_value,
                    new_value: *new_value,
                })
            }
            (TriggerValue::String(old_value), TriggerValue::String(new_value)) => {
                Some(StateMachineEvent::StringTriggerValueChange {
                    name: name.to_string(),
                    old_value,
                    new_value: new_value.clone(),
                })
            }
            (old, new) => {
                debug_assert!(false, "trigger '{name}' changed kind: {old:?} -> {new:?}");
                None
            }
        };
        self.pending.extend(change);
        self.pending.push(StateMachineEvent::TriggerFired {
            name: name.to_string(),
        });
        Ok(true)
    }

    /// Return one trigger to its declared default, notifying on change.
    pub fn reset(&mut self, name: &str) -> Result<bool> {
        let default = self
            .slots
            .get(name)
            .map(|s| s.default.clone())
            .ok_or_else(|| StateMachineError::not_found("trigger", name))?;
        self.set(name, default)
    }

    /// Return every trigger to its default without notifying.
    pub fn reset_all_silently(&mut self) {
        for slot in self.slots.values_mut() {
            slot.value = slot.default.clone();
        }
        self.pending.clear();
    }

    /// Notifications queued since the last drain, in order.
    pub fn take_notifications(&mut self) -> Vec<StateMachineEvent> {
        std::mem::take(&mut self.pending)
    }
}
