use std::sync::Arc;

use anyhow::Result;
use kinema_player_core::{Animation, NullRasterizer, PlayerEvent};
use kinema_runtime::{ErrorCode, Runtime, RuntimeConfig};
use kinema_state_machine_core::{Event, StateMachineEvent, TriggerValue};
use kinema_test_fixtures as fixtures;
use parking_lot::Mutex;
use serde_json::{json, Value};

fn runtime(config: RuntimeConfig) -> Result<Runtime> {
    let mut rt = Runtime::new(NullRasterizer::new(), config);
    for id in ["walk-cycle", "button"] {
        let animation: Animation = fixtures::animations::load(id)?;
        rt.register_animation(id, animation)?;
    }
    Ok(rt)
}

fn hover_walk_waving(config: RuntimeConfig) -> Result<Runtime> {
    let mut rt = runtime(config)?;
    rt.load_state_machine(&fixtures::state_machines::json("hover-walk")?)?;
    rt.state_machine_start()?;
    rt.post_event(&Event::PointerEnter { x: 0.0, y: 0.0 })?;
    rt.post_event(&Event::Click { x: 0.0, y: 0.0 })?;
    assert_eq!(rt.current_state(), Some("wave"));
    Ok(rt)
}

fn tick_until_complete(rt: &mut Runtime) -> Result<()> {
    for _ in 0..50 {
        if rt.tick(100.0)?.completed {
            return Ok(());
        }
    }
    anyhow::bail!("playback never completed")
}

fn call(rt: &mut Runtime, request: Value) -> Value {
    let raw = rt.handle_json(&request.to_string());
    serde_json::from_str(&raw).unwrap()
}

/// it should post Complete to the machine when playback finishes
#[test]
fn tick_forwards_completion() -> Result<()> {
    let mut rt = hover_walk_waving(RuntimeConfig::default())?;
    tick_until_complete(&mut rt)?;
    assert_eq!(rt.current_state(), Some("walk"));
    assert_eq!(rt.get_trigger("waves")?, TriggerValue::Numeric(1.0));
    assert!(rt.player().is_playing(), "walk loops");
    Ok(())
}

#[test]
fn forwarding_can_be_disabled() -> Result<()> {
    let mut rt = hover_walk_waving(RuntimeConfig {
        forward_playback_events: false,
        ..Default::default()
    })?;
    tick_until_complete(&mut rt)?;
    assert_eq!(rt.current_state(), Some("wave"));
    assert!(rt.player().is_complete());
    Ok(())
}

#[test]
fn final_state_reached_through_playback() -> Result<()> {
    let mut rt = hover_walk_waving(RuntimeConfig::default())?;
    rt.set_trigger("maxWaves", TriggerValue::Numeric(1.0))?;
    tick_until_complete(&mut rt)?;
    assert_eq!(rt.current_state(), None);
    // Further completions are not forwarded to a stopped machine.
    rt.tick(100.0)?;
    Ok(())
}

#[test]
fn listeners_see_both_streams() -> Result<()> {
    let mut rt = runtime(RuntimeConfig::default())?;
    let player_log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let machine_log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let on_player = {
        let log = player_log.clone();
        Arc::new(move |e: &PlayerEvent| log.lock().push(e.name()))
    };
    let on_machine = {
        let log = machine_log.clone();
        Arc::new(move |e: &StateMachineEvent| log.lock().push(e.name()))
    };
    let player_id = rt.subscribe_player(&on_player);
    rt.subscribe_state_machine(&on_machine);

    rt.load_state_machine(&fixtures::state_machines::json("toggle-button")?)?;
    rt.state_machine_start()?;
    assert_eq!(*player_log.lock(), vec!["load", "play"]);
    assert_eq!(*machine_log.lock(), vec!["start", "state_entered"]);

    assert!(rt.unsubscribe_player(player_id));
    rt.tick(16.0)?;
    assert_eq!(player_log.lock().len(), 2);
    Ok(())
}

/// it should drive a whole session through JSON requests
#[test]
fn json_session_round_trip() -> Result<()> {
    let mut rt = Runtime::new(NullRasterizer::new(), RuntimeConfig::default());
    let animation: Value = fixtures::animations::load("bouncing-ball")?;
    let definition: Value = fixtures::state_machines::load("score-gate")?;

    let r = call(&mut rt, json!({"op": "loadAnimation", "id": "ball", "animation": animation}));
    assert_eq!(r["ok"], true);
    let r = call(&mut rt, json!({"op": "loadStateMachine", "definition": definition}));
    assert_eq!(r["ok"], true);
    assert_eq!(call(&mut rt, json!({"op": "startStateMachine"}))["ok"], true);

    let r = call(&mut rt, json!({"op": "setTrigger", "name": "score", "value": 12}));
    assert_eq!(r["result"], true);
    let r = call(&mut rt, json!({"op": "postEvent", "event": {"type": "Complete"}}));
    assert_eq!(r["result"], true);
    let r = call(&mut rt, json!({"op": "getTrigger", "name": "score"}));
    assert_eq!(r["result"], 12.0);

    assert_eq!(call(&mut rt, json!({"op": "play"}))["ok"], true);
    let r = call(&mut rt, json!({"op": "tick", "elapsedMs": 50}));
    assert_eq!(r["result"]["rendered"], true);

    let status = call(&mut rt, json!({"op": "status"}));
    assert_eq!(status["result"]["animation"], "ball");
    assert_eq!(status["result"]["currentState"], "B");
    assert_eq!(status["result"]["stateMachine"], "Running");
    assert_eq!(status["result"]["player"], "Playing");
    Ok(())
}

#[test]
fn json_errors_carry_codes() -> Result<()> {
    let mut rt = runtime(RuntimeConfig::default())?;
    let code = |v: &Value| v["error"]["code"].as_str().map(str::to_string);

    let r: Value = serde_json::from_str(&rt.handle_json("{not json"))?;
    assert_eq!(r["ok"], false);
    assert_eq!(code(&r).as_deref(), Some("validationError"));

    let r = call(&mut rt, json!({"op": "launch"}));
    assert_eq!(code(&r).as_deref(), Some("validationError"));

    let r = call(&mut rt, json!({"op": "loadAnimationById", "id": "ghost"}));
    assert_eq!(code(&r).as_deref(), Some("resourceNotFound"));

    let r = call(&mut rt, json!({"op": "play"}));
    assert_eq!(code(&r).as_deref(), Some("invalidState"));

    let r = call(&mut rt, json!({"op": "loadStateMachine", "definition": {"initial": "x"}}));
    assert_eq!(code(&r).as_deref(), Some("validationError"));

    let definition: Value = fixtures::state_machines::load("score-gate")?;
    call(&mut rt, json!({"op": "loadStateMachine", "definition": definition}));
    let r = call(&mut rt, json!({"op": "postEvent", "event": {"type": "Complete"}}));
    assert_eq!(code(&r).as_deref(), Some("invalidState"));

    let r = call(&mut rt, json!({"op": "setTrigger", "name": "score", "value": "ten"}));
    assert_eq!(code(&r).as_deref(), Some("typeMismatch"));

    call(&mut rt, json!({"op": "startStateMachine"}));
    let r = call(&mut rt, json!({"op": "overrideCurrentState", "state": "Z"}));
    assert_eq!(code(&r).as_deref(), Some("notFound"));

    let r = call(
        &mut rt,
        json!({"op": "setConfig", "config": {"speed": -1.0}}),
    );
    assert_eq!(code(&r).as_deref(), Some("invalidConfig"));
    Ok(())
}

#[test]
fn failed_requests_leave_playback_untouched() -> Result<()> {
    let mut rt = runtime(RuntimeConfig::default())?;
    rt.load_animation_by_id("button")?;
    rt.seek(12.0)?;
    let before = rt.status();
    let r = call(&mut rt, json!({"op": "seek", "frame": 400}));
    assert_eq!(r["ok"], false);
    let r = call(&mut rt, json!({"op": "tweenTo", "frame": 5, "durationMs": 0}));
    assert_eq!(r["ok"], false);
    assert_eq!(rt.status(), before);
    Ok(())
}

#[test]
fn tween_requests_drive_the_player() -> Result<()> {
    let mut rt = runtime(RuntimeConfig::default())?;
    rt.load_animation_by_id("walk-cycle")?;
    let r = call(
        &mut rt,
        json!({"op": "tweenToMarker", "marker": "wave", "durationMs": 100, "easing": [0.42, 0.0, 0.58, 1.0]}),
    );
    assert_eq!(r["ok"], true);
    assert!(rt.is_tweening());
    rt.tick(100.0)?;
    assert!(!rt.is_tweening());
    assert_eq!(rt.player().current_frame(), 90.0);
    Ok(())
}

/// it should enter a tweened transition's target on the tick that ends the tween
#[test]
fn tick_completes_state_machine_tweens() -> Result<()> {
    let mut rt = runtime(RuntimeConfig::default())?;
    rt.load_state_machine(&fixtures::state_machines::json("glide-walk")?)?;
    rt.state_machine_start()?;
    assert!(rt.post_event(&Event::Click { x: 0.0, y: 0.0 })?);

    let status = call(&mut rt, json!({"op": "status"}));
    assert_eq!(status["result"]["stateMachine"], "Tweening");
    assert_eq!(status["result"]["currentState"], "idle");
    assert_eq!(status["result"]["tweening"], true);

    rt.tick(150.0)?;
    assert_eq!(rt.current_state(), Some("idle"));
    rt.tick(150.0)?;
    assert_eq!(rt.current_state(), Some("wave"));
    assert_eq!(rt.player().current_frame(), 90.0);

    tick_until_complete(&mut rt)?;
    assert_eq!(rt.current_state(), Some("walk"));
    Ok(())
}

#[test]
fn stopping_the_player_tween_releases_the_machine() -> Result<()> {
    let mut rt = runtime(RuntimeConfig::default())?;
    rt.load_state_machine(&fixtures::state_machines::json("glide-walk")?)?;
    rt.state_machine_start()?;
    rt.post_event(&Event::PointerEnter { x: 0.0, y: 0.0 })?;
    assert!(rt.tween_stop());
    assert_eq!(rt.current_state(), Some("walk"));
    assert_eq!(rt.config().marker.as_deref(), Some("walk"));
    Ok(())
}

#[test]
fn decoder_failures_are_decode_errors() {
    let mut rt = Runtime::new(NullRasterizer::new(), RuntimeConfig::default());
    let err = rt.load_animation_json("{\"totalFrames\": ").unwrap_err();
    assert_eq!(err.code(), ErrorCode::DecodeError);
    rt.load_animation_json(r#"{"totalFrames": 30, "duration": 1.0}"#)
        .unwrap();
    assert_eq!(rt.player().total_frames(), 30.0);
}
