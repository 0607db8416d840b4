//! JSON request/response surface for hosts that cannot call Rust directly.
//!
//! A request is an object tagged by `"op"`; every response carries `ok` and either a
//! `result` or an `error` with a stable code. Subscriptions stay on the Rust API since
//! listeners cannot cross a JSON boundary.

use kinema_player_core::{Animation, PlaybackConfig, Status as PlayerStatus, Viewport};
use kinema_state_machine_core::{Event, StateMachineDefinition, Status as MachineStatus, TriggerValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, Result, RuntimeError};
use crate::runtime::Runtime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    /// Activate `animation`; with an `id` it is also registered in the library.
    LoadAnimation {
        #[serde(default)]
        id: Option<String>,
        animation: Animation,
    },
    LoadAnimationById {
        id: String,
    },
    Play,
    Pause,
    Stop,
    Seek {
        frame: f32,
    },
    SetProgress {
        progress: f32,
    },
    SetConfig {
        config: PlaybackConfig,
    },
    GetConfig,
    SetViewport {
        viewport: Viewport,
    },
    Tick {
        elapsed_ms: f32,
    },
    RenderFrame,
    TweenTo {
        frame: f32,
        duration_ms: f32,
        #[serde(default)]
        easing: Option<[f32; 4]>,
    },
    TweenToMarker {
        marker: String,
        duration_ms: f32,
        #[serde(default)]
        easing: Option<[f32; 4]>,
    },
    TweenStop,
    Status,
    LoadStateMachine {
        definition: Value,
    },
    UnloadStateMachine,
    StartStateMachine,
    StopStateMachine,
    PauseStateMachine,
    ResumeStateMachine,
    PostEvent {
        event: Event,
    },
    SetTrigger {
        name: String,
        value: TriggerValue,
    },
    GetTrigger {
        name: String,
    },
    ResetTrigger {
        name: String,
    },
    OverrideCurrentState {
        state: String,
        #[serde(default)]
        do_tick: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(result: Option<Value>) -> Self {
        Self {
            ok: true,
            result,
            error: None,
        }
    }

    pub fn failure(err: &RuntimeError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }
}

/// Snapshot returned by the `status` op.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    pub animation: Option<String>,
    pub player: PlayerStatus,
    pub frame: f32,
    pub total_frames: f32,
    pub loop_count: u32,
    pub tweening: bool,
    pub state_machine: MachineStatus,
    pub current_state: Option<String>,
}

fn to_result<T: Serialize>(value: T) -> Result<Option<Value>> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| RuntimeError::request(format!("unserializable result: {e}")))
}

impl Runtime {
    pub fn status(&self) -> RuntimeStatus {
        let player = self.player();
        RuntimeStatus {
            animation: player.active_animation_id().map(str::to_string),
            player: player.status(),
            frame: player.current_frame(),
            total_frames: player.total_frames(),
            loop_count: player.loop_count(),
            tweening: player.is_tweening(),
            state_machine: self.state_machine().status(),
            current_state: self.current_state().map(str::to_string),
        }
    }

    /// Execute one request. Failures are reported in the response, never raised.
    pub fn handle(&mut self, request: Request) -> Response {
        match self.dispatch(request) {
            Ok(result) => Response::success(result),
            Err(err) => {
                log::debug!("request failed ({:?}): {err}", err.code());
                Response::failure(&err)
            }
        }
    }

    /// Parse a JSON request, execute it and serialize the response.
    pub fn handle_json(&mut self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request),
            Err(e) => Response::failure(&RuntimeError::request(e.to_string())),
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(
                r#"{{"ok":false,"error":{{"code":"internal","message":{:?}}}}}"#,
                e.to_string()
            )
        })
    }

    fn dispatch(&mut self, request: Request) -> Result<Option<Value>> {
        match request {
            Request::LoadAnimation { id, animation } => match id {
                Some(id) => {
                    self.register_animation(id.as_str(), animation)?;
                    self.load_animation_by_id(&id)?;
                    Ok(None)
                }
                None => self.load_animation(animation).map(|_| None),
            },
            Request::LoadAnimationById { id } => self.load_animation_by_id(&id).map(|_| None),
            Request::Play => self.play().map(|_| None),
            Request::Pause => self.pause().map(|_| None),
            Request::Stop => self.stop().map(|_| None),
            Request::Seek { frame } => self.seek(frame).map(|_| None),
            Request::SetProgress { progress } => self.set_progress(progress).map(|_| None),
            Request::SetConfig { config } => self.set_config(config).map(|_| None),
            Request::GetConfig => to_result(self.config()),
            Request::SetViewport { viewport } => {
                self.set_viewport(viewport);
                Ok(None)
            }
            Request::Tick { elapsed_ms } => to_result(self.tick(elapsed_ms)?),
            Request::RenderFrame => to_result(self.render_frame()?),
            Request::TweenTo {
                frame,
                duration_ms,
                easing,
            } => self.tween_to(frame, duration_ms, easing).map(|_| None),
            Request::TweenToMarker {
                marker,
                duration_ms,
                easing,
            } => self
                .tween_to_marker(&marker, duration_ms, easing)
                .map(|_| None),
            Request::TweenStop => to_result(self.tween_stop()),
            Request::Status => to_result(self.status()),
            Request::LoadStateMachine { definition } => {
                let definition: StateMachineDefinition = serde_json::from_value(definition)
                    .map_err(kinema_state_machine_core::StateMachineError::from)?;
                self.load_state_machine_definition(definition).map(|_| None)
            }
            Request::UnloadStateMachine => self.unload_state_machine().map(|_| None),
            Request::StartStateMachine => self.state_machine_start().map(|_| None),
            Request::StopStateMachine => self.state_machine_stop().map(|_| None),
            Request::PauseStateMachine => self.state_machine_pause().map(|_| None),
            Request::ResumeStateMachine => self.state_machine_resume().map(|_| None),
            Request::PostEvent { event } => to_result(self.post_event(&event)?),
            Request::SetTrigger { name, value } => to_result(self.set_trigger(&name, value)?),
            Request::GetTrigger { name } => to_result(self.get_trigger(&name)?),
            Request::ResetTrigger { name } => to_result(self.reset_trigger(&name)?),
            Request::OverrideCurrentState { state, do_tick } => self
                .override_current_state(&state, do_tick)
                .map(|_| None),
        }
    }
}
