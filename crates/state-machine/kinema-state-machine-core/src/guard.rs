//! Transition guards. Evaluation is pure and total: anything unresolvable is `false`.

use serde::{Deserialize, Serialize};

use crate::trigger::TriggerStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl ConditionType {
    /// Ordering comparisons only make sense for numeric triggers.
    pub fn is_ordering(self) -> bool {
        !matches!(self, ConditionType::Equal | ConditionType::NotEqual)
    }

    fn holds<T: PartialOrd>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            ConditionType::GreaterThan => lhs > rhs,
            ConditionType::GreaterThanOrEqual => lhs >= rhs,
            ConditionType::LessThan => lhs < rhs,
            ConditionType::LessThanOrEqual => lhs <= rhs,
            ConditionType::Equal => lhs == rhs,
            ConditionType::NotEqual => lhs != rhs,
        }
    }
}

/// Numeric literal or `"$trigger"` reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrRef {
    Number(f32),
    Ref(String),
}

/// Boolean literal or `"$trigger"` reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolOrRef {
    Bool(bool),
    Ref(String),
}

/// Name of the referenced trigger when `raw` is a `$name` reference.
pub fn reference(raw: &str) -> Option<&str> {
    raw.strip_prefix('$').filter(|name| !name.is_empty())
}

impl NumberOrRef {
    pub fn resolve(&self, triggers: &TriggerStore) -> Option<f32> {
        match self {
            NumberOrRef::Number(n) => Some(*n),
            NumberOrRef::Ref(raw) => triggers.numeric(reference(raw)?),
        }
    }
}

impl BoolOrRef {
    pub fn resolve(&self, triggers: &TriggerStore) -> Option<bool> {
        match self {
            BoolOrRef::Bool(b) => Some(*b),
            BoolOrRef::Ref(raw) => triggers.boolean(reference(raw)?),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Guard {
    Numeric {
        trigger_name: String,
        condition_type: ConditionType,
        compare_to: NumberOrRef,
    },
    /// `compare_to` starting with `$` names another string trigger.
    String {
        trigger_name: String,
        condition_type: ConditionType,
        compare_to: String,
    },
    Boolean {
        trigger_name: String,
        condition_type: ConditionType,
        compare_to: BoolOrRef,
    },
    /// Holds when the posted event carries this tag.
    Event { event_name: String },
}

impl Guard {
    pub fn is_event(&self) -> bool {
        matches!(self, Guard::Event { .. })
    }

    pub fn evaluate(&self, triggers: &TriggerStore, event_tag: Option<&str>) -> bool {
        match self {
            Guard::Numeric {
                trigger_name,
                condition_type,
                compare_to,
            } => match (triggers.numeric(trigger_name), compare_to.resolve(triggers)) {
                (Some(lhs), Some(rhs)) => condition_type.holds(&lhs, &rhs),
                _ => false,
            },
            Guard::String {
                trigger_name,
                condition_type,
                compare_to,
            } => {
                if condition_type.is_ordering() {
                    return false;
                }
                let rhs = match reference(compare_to) {
                    Some(other) => triggers.string(other),
                    None => Some(compare_to.as_str()),
                };
                match (triggers.string(trigger_name), rhs) {
                    (Some(lhs), Some(rhs)) => condition_type.holds(&lhs, &rhs),
                    _ => false,
                }
            }
            Guard::Boolean {
                trigger_name,
                condition_type,
                compare_to,
            } => {
                if condition_type.is_ordering() {
                    return false;
                }
                match (triggers.boolean(trigger_name), compare_to.resolve(triggers)) {
                    (Some(lhs), Some(rhs)) => condition_type.holds(&lhs, &rhs),
                    _ => false,
                }
            }
            Guard::Event { event_name } => event_tag == Some(event_name.as_str()),
        }
    }
}

/// All guards hold. An empty list holds.
pub fn all_hold(guards: &[Guard], triggers: &TriggerStore, event_tag: Option<&str>) -> bool {
    guards.iter().all(|g| g.evaluate(triggers, event_tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerValue;

    fn triggers() -> TriggerStore {
        let mut t = TriggerStore::new();
        t.declare("score", TriggerValue::Numeric(7.0)).unwrap();
        t.declare("limit", TriggerValue::Numeric(10.0)).unwrap();
        t.declare("armed", TriggerValue::Boolean(true)).unwrap();
        t.declare("mode", TriggerValue::String("dark".into()))
            .unwrap();
        t.declare("theme", TriggerValue::String("dark".into()))
            .unwrap();
        t
    }

    fn numeric(cond: ConditionType, rhs: NumberOrRef) -> Guard {
        Guard::Numeric {
            trigger_name: "score".into(),
            condition_type: cond,
            compare_to: rhs,
        }
    }

    #[test]
    fn numeric_conditions() {
        let t = triggers();
        assert!(numeric(ConditionType::GreaterThan, NumberOrRef::Number(5.0)).evaluate(&t, None));
        assert!(!numeric(ConditionType::GreaterThanOrEqual, NumberOrRef::Number(10.0))
            .evaluate(&t, None));
        assert!(numeric(ConditionType::LessThan, NumberOrRef::Ref("$limit".into())).evaluate(&t, None));
        assert!(numeric(ConditionType::NotEqual, NumberOrRef::Number(0.0)).evaluate(&t, None));
    }

    #[test]
    fn unresolved_reference_is_false() {
        let t = triggers();
        assert!(!numeric(ConditionType::LessThan, NumberOrRef::Ref("$ghost".into()))
            .evaluate(&t, None));
        assert!(!numeric(ConditionType::LessThan, NumberOrRef::Ref("limit".into()))
            .evaluate(&t, None));
        let missing = Guard::Boolean {
            trigger_name: "ghost".into(),
            condition_type: ConditionType::Equal,
            compare_to: BoolOrRef::Bool(true),
        };
        assert!(!missing.evaluate(&t, None));
    }

    #[test]
    fn string_guard_compares_literal_and_reference() {
        let t = triggers();
        let literal = Guard::String {
            trigger_name: "mode".into(),
            condition_type: ConditionType::Equal,
            compare_to: "dark".into(),
        };
        let by_ref = Guard::String {
            trigger_name: "mode".into(),
            condition_type: ConditionType::Equal,
            compare_to: "$theme".into(),
        };
        let ordering = Guard::String {
            trigger_name: "mode".into(),
            condition_type: ConditionType::GreaterThan,
            compare_to: "a".into(),
        };
        assert!(literal.evaluate(&t, None));
        assert!(by_ref.evaluate(&t, None));
        assert!(!ordering.evaluate(&t, None));
    }

    #[test]
    fn kind_mismatch_evaluates_false() {
        let t = triggers();
        let g = Guard::Numeric {
            trigger_name: "armed".into(),
            condition_type: ConditionType::Equal,
            compare_to: NumberOrRef::Number(1.0),
        };
        assert!(!g.evaluate(&t, None));
    }

    #[test]
    fn event_guard_matches_tag_and_guards_are_anded() {
        let t = triggers();
        let guards = vec![
            Guard::Event {
                event_name: "Click".into(),
            },
            Guard::Boolean {
                trigger_name: "armed".into(),
                condition_type: ConditionType::Equal,
                compare_to: BoolOrRef::Bool(true),
            },
        ];
        assert!(all_hold(&guards, &t, Some("Click")));
        assert!(!all_hold(&guards, &t, Some("PointerDown")));
        assert!(!all_hold(&guards, &t, None));
        assert!(all_hold(&[], &t, None));
    }

    #[test]
    fn guards_parse_from_camel_case_json() {
        let g: Guard = serde_json::from_str(
            r#"{"type": "Numeric", "triggerName": "score", "conditionType": "GreaterThanOrEqual", "compareTo": 10}"#,
        )
        .unwrap();
        assert_eq!(
            g,
            numeric(ConditionType::GreaterThanOrEqual, NumberOrRef::Number(10.0))
        );
    }
}
