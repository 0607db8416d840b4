//! Side effects attached to states, transitions and interactions.

use kinema_player_core::PlaybackEngine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StateMachineError};
use crate::event::Event;
use crate::guard::NumberOrRef;
use crate::notification::StateMachineEvent;
use crate::trigger::{TriggerKind, TriggerStore, TriggerValue};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Action {
    SetBoolean {
        trigger_name: String,
        value: bool,
    },
    SetNumeric {
        trigger_name: String,
        value: f32,
    },
    SetString {
        trigger_name: String,
        value: String,
    },
    /// Add `value` (default 1) to a numeric trigger.
    Increment {
        trigger_name: String,
        #[serde(default)]
        value: Option<NumberOrRef>,
    },
    Decrement {
        trigger_name: String,
        #[serde(default)]
        value: Option<NumberOrRef>,
    },
    Toggle {
        trigger_name: String,
    },
    Reset {
        trigger_name: String,
    },
    /// Queue a synthetic custom event, processed after the current one.
    Fire {
        event_name: String,
    },
    /// Notify listeners with a `CustomEvent`.
    FireCustomEvent {
        value: String,
    },
    SetFrame {
        value: NumberOrRef,
    },
    /// Fraction of the active range, 0..=1.
    SetProgress {
        value: NumberOrRef,
    },
    Play,
    Pause,
    Stop,
}

/// Everything an action may touch.
pub(crate) struct ActionContext<'a> {
    pub triggers: &'a mut TriggerStore,
    pub player: &'a mut dyn PlaybackEngine,
    /// Synthetic events queued by `Fire`.
    pub fired: &'a mut Vec<Event>,
    /// Notifications to deliver after the surrounding transition ones.
    pub notices: &'a mut Vec<StateMachineEvent>,
}

impl Action {
    /// Trigger written or read by this action, with the kind it requires.
    pub fn trigger_ref(&self) -> Option<(&str, TriggerKind)> {
        match self {
            Action::SetBoolean { trigger_name, .. } | Action::Toggle { trigger_name } => {
                Some((trigger_name.as_str(), TriggerKind::Boolean))
            }
            Action::SetNumeric { trigger_name, .. }
            | Action::Increment { trigger_name, .. }
            | Action::Decrement { trigger_name, .. } => {
                Some((trigger_name.as_str(), TriggerKind::Numeric))
            }
            Action::SetString { trigger_name, .. } => {
                Some((trigger_name.as_str(), TriggerKind::String))
            }
            _ => None,
        }
    }

    /// Numeric operand that may be a `$trigger` reference.
    pub fn operand(&self) -> Option<&NumberOrRef> {
        match self {
            Action::Increment { value, .. } | Action::Decrement { value, .. } => value.as_ref(),
            Action::SetFrame { value } | Action::SetProgress { value } => Some(value),
            _ => None,
        }
    }

    /// Trigger named by a `Reset`.
    pub fn reset_target(&self) -> Option<&str> {
        match self {
            Action::Reset { trigger_name } => Some(trigger_name.as_str()),
            _ => None,
        }
    }

    pub(crate) fn execute(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let outcome = self.run(ctx);
        ctx.notices.extend(ctx.triggers.take_notifications());
        outcome
    }

    fn run(&self, ctx: &mut ActionContext<'_>) -> Result<()> {
        match self {
            Action::SetBoolean {
                trigger_name,
                value,
            } => ctx
                .triggers
                .set(trigger_name, TriggerValue::Boolean(*value))
                .map(drop),
            Action::SetNumeric {
                trigger_name,
                value,
            } => ctx
                .triggers
                .set(trigger_name, TriggerValue::Numeric(*value))
                .map(drop),
            Action::SetString {
                trigger_name,
                value,
            } => ctx
                .triggers
                .set(trigger_name, TriggerValue::String(value.clone()))
                .map(drop),
            Action::Increment {
                trigger_name,
                value,
            } => step(ctx.triggers, trigger_name, value.as_ref(), 1.0),
            Action::Decrement {
                trigger_name,
                value,
            } => step(ctx.triggers, trigger_name, value.as_ref(), -1.0),
            Action::Toggle { trigger_name } => {
                let current = ctx.triggers.boolean(trigger_name).ok_or_else(|| {
                    mismatch(&*ctx.triggers, trigger_name, TriggerKind::Boolean)
                })?;
                ctx.triggers
                    .set(trigger_name, TriggerValue::Boolean(!current))
                    .map(drop)
            }
            Action::Reset { trigger_name } => ctx.triggers.reset(trigger_name).map(drop),
            Action::Fire { event_name } => {
                ctx.fired.push(Event::custom(event_name.as_str()));
                Ok(())
            }
            Action::FireCustomEvent { value } => {
                ctx.notices.push(StateMachineEvent::CustomEvent {
                    message: value.clone(),
                });
                Ok(())
            }
            Action::SetFrame { value } => {
                let frame = resolve(ctx.triggers, value)?;
                Ok(ctx.player.seek(frame)?)
            }
            Action::SetProgress { value } => {
                let progress = resolve(ctx.triggers, value)?;
                Ok(ctx.player.set_progress(progress)?)
            }
            Action::Play => Ok(ctx.player.play()?),
            Action::Pause => Ok(ctx.player.pause()?),
            Action::Stop => Ok(ctx.player.stop()?),
        }
    }
}

fn mismatch(triggers: &TriggerStore, name: &str, expected: TriggerKind) -> StateMachineError {
    match triggers.kind(name) {
        Some(actual) => StateMachineError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual,
        },
        None => StateMachineError::not_found("trigger", name),
    }
}

fn resolve(triggers: &TriggerStore, value: &NumberOrRef) -> Result<f32> {
    value.resolve(triggers).ok_or_else(|| match value {
        NumberOrRef::Ref(raw) => StateMachineError::not_found("trigger", raw.as_str()),
        NumberOrRef::Number(_) => StateMachineError::validation("unresolvable operand"),
    })
}

fn step(
    triggers: &mut TriggerStore,
    name: &str,
    amount: Option<&NumberOrRef>,
    sign: f32,
) -> Result<()> {
    let current = triggers
        .numeric(name)
        .ok_or_else(|| mismatch(&*triggers, name, TriggerKind::Numeric))?;
    let amount = match amount {
        Some(v) => resolve(triggers, v)?,
        None => 1.0,
    };
    triggers
        .set(name, TriggerValue::Numeric(current + sign * amount))
        .map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_player_core::{Animation, NullRasterizer, Player};

    fn setup() -> (TriggerStore, Player) {
        let mut t = TriggerStore::new();
        t.declare("count", TriggerValue::Numeric(1.0)).unwrap();
        t.declare("step", TriggerValue::Numeric(4.0)).unwrap();
        t.declare("lit", TriggerValue::Boolean(false)).unwrap();
        let mut p = Player::new(NullRasterizer::new());
        p.load_animation(Animation::new(101.0, 1.0)).unwrap();
        (t, p)
    }

    type Outcome = (Result<()>, Vec<Event>, Vec<StateMachineEvent>);

    fn run(action: &Action, t: &mut TriggerStore, p: &mut Player) -> Outcome {
        let mut fired = Vec::new();
        let mut notices = Vec::new();
        let mut ctx = ActionContext {
            triggers: t,
            player: p,
            fired: &mut fired,
            notices: &mut notices,
        };
        let r = action.execute(&mut ctx);
        (r, fired, notices)
    }

    #[test]
    fn increment_by_reference_and_default() {
        let (mut t, mut p) = setup();
        let inc = Action::Increment {
            trigger_name: "count".into(),
            value: Some(NumberOrRef::Ref("$step".into())),
        };
        let (r, _, notices) = run(&inc, &mut t, &mut p);
        r.unwrap();
        assert_eq!(t.numeric("count"), Some(5.0));
        assert_eq!(notices.len(), 2);
        let dec = Action::Decrement {
            trigger_name: "count".into(),
            value: None,
        };
        run(&dec, &mut t, &mut p).0.unwrap();
        assert_eq!(t.numeric("count"), Some(4.0));
    }

    #[test]
    fn toggle_flips_boolean_and_rejects_numeric() {
        let (mut t, mut p) = setup();
        let toggle = Action::Toggle {
            trigger_name: "lit".into(),
        };
        run(&toggle, &mut t, &mut p).0.unwrap();
        assert_eq!(t.boolean("lit"), Some(true));
        let bad = Action::Toggle {
            trigger_name: "count".into(),
        };
        assert!(matches!(
            run(&bad, &mut t, &mut p).0,
            Err(StateMachineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn fire_queues_synthetic_event() {
        let (mut t, mut p) = setup();
        let (r, fired, notices) = run(
            &Action::Fire {
                event_name: "boom".into(),
            },
            &mut t,
            &mut p,
        );
        r.unwrap();
        assert_eq!(fired, vec![Event::custom("boom")]);
        assert!(notices.is_empty());
    }

    #[test]
    fn set_frame_drives_player() {
        let (mut t, mut p) = setup();
        let (r, _, _) = run(
            &Action::SetFrame {
                value: NumberOrRef::Number(42.0),
            },
            &mut t,
            &mut p,
        );
        r.unwrap();
        assert_eq!(p.current_frame(), 42.0);
        let (r, _, _) = run(
            &Action::SetProgress {
                value: NumberOrRef::Number(0.5),
            },
            &mut t,
            &mut p,
        );
        r.unwrap();
        assert_eq!(p.current_frame(), 50.0);
    }

    #[test]
    fn actions_parse_from_json() {
        let a: Vec<Action> = serde_json::from_str(
            r#"[{"type": "Increment", "triggerName": "count"},
                {"type": "SetFrame", "value": "$step"},
                {"type": "Play"}]"#,
        )
        .unwrap();
        assert_eq!(
            a[0],
            Action::Increment {
                trigger_name: "count".into(),
                value: None
            }
        );
        assert_eq!(
            a[1],
            Action::SetFrame {
                value: NumberOrRef::Ref("$step".into())
            }
        );
        assert_eq!(a[2], Action::Play);
    }
}
