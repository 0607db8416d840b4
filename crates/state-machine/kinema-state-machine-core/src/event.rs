//! Messages posted into a running state machine.

use serde::{Deserialize, Serialize};

use crate::trigger::TriggerValue;

/// Transient input to `post_event`. Pointer coordinates are animation-local pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Event {
    PointerDown { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerEnter { x: f32, y: f32 },
    PointerExit { x: f32, y: f32 },
    Click { x: f32, y: f32 },
    /// Playback reached its final bound.
    Complete,
    /// Playback wrapped or finished a bounce cycle.
    LoopComplete,
    SetBoolean { name: String, value: bool },
    SetNumeric { name: String, value: f32 },
    SetString { name: String, value: String },
    Custom { name: String },
}

/// Tags of the host-posted pointer and playback events.
const BUILTIN_TAGS: [&str; 8] = [
    "PointerDown",
    "PointerUp",
    "PointerMove",
    "PointerEnter",
    "PointerExit",
    "Click",
    "Complete",
    "LoopComplete",
];

impl Event {
    /// Whether `name` is the tag of a built-in event. Triggers may not use these names.
    pub fn is_builtin_tag(name: &str) -> bool {
        BUILTIN_TAGS.contains(&name)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Event::Custom { name: name.into() }
    }

    /// Tag matched by `Event` guards. Value-set events are tagged with the trigger name.
    pub fn tag(&self) -> &str {
        match self {
            Event::PointerDown { .. } => "PointerDown",
            Event::PointerUp { .. } => "PointerUp",
            Event::PointerMove { .. } => "PointerMove",
            Event::PointerEnter { .. } => "PointerEnter",
            Event::PointerExit { .. } => "PointerExit",
            Event::Click { .. } => "Click",
            Event::Complete => "Complete",
            Event::LoopComplete => "LoopComplete",
            Event::SetBoolean { name, .. }
            | Event::SetNumeric { name, .. }
            | Event::SetString { name, .. } => name.as_str(),
            Event::Custom { name } => name.as_str(),
        }
    }

    /// Trigger assignment carried by a value-set event.
    pub fn assignment(&self) -> Option<(&str, TriggerValue)> {
        match self {
            Event::SetBoolean { name, value } => {
                Some((name.as_str(), TriggerValue::Boolean(*value)))
            }
            Event::SetNumeric { name, value } => {
                Some((name.as_str(), TriggerValue::Numeric(*value)))
            }
            Event::SetString { name, value } => {
                Some((name.as_str(), TriggerValue::String(value.clone())))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_set_events_are_tagged_by_trigger() {
        let e = Event::SetNumeric {
            name: "score".into(),
            value: 3.0,
        };
        assert_eq!(e.tag(), "score");
        assert_eq!(
            e.assignment(),
            Some(("score", TriggerValue::Numeric(3.0)))
        );
        assert_eq!(Event::Click { x: 1.0, y: 2.0 }.tag(), "Click");
        assert_eq!(Event::custom("boom").tag(), "boom");
    }

    #[test]
    fn events_parse_from_json() {
        let e: Event = serde_json::from_str(r#"{"type": "PointerDown", "x": 4, "y": 5}"#).unwrap();
        assert_eq!(e, Event::PointerDown { x: 4.0, y: 5.0 });
        let e: Event = serde_json::from_str(r#"{"type": "Complete"}"#).unwrap();
        assert_eq!(e, Event::Complete);
    }

    #[test]
    fn builtin_tags_cover_host_events() {
        let events = [
            Event::PointerDown { x: 0.0, y: 0.0 },
            Event::PointerUp { x: 0.0, y: 0.0 },
            Event::PointerMove { x: 0.0, y: 0.0 },
            Event::PointerEnter { x: 0.0, y: 0.0 },
            Event::PointerExit { x: 0.0, y: 0.0 },
            Event::Click { x: 0.0, y: 0.0 },
            Event::Complete,
            Event::LoopComplete,
        ];
        for e in &events {
            assert!(Event::is_builtin_tag(e.tag()), "{e:?}");
        }
        assert!(!Event::is_builtin_tag("score"));
        assert!(!Event::is_builtin_tag("click"));
    }
}
