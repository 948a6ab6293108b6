//! `GET /functions/v1/jumps-realtime-generation`: WebSocket transport.
//!
//! Client sends `{"type": "generate", "payload": {...}}` or `{"type": "ping"}`.
//! Server replies with `status`, `infrastructure_ready`, `plan_ready`,
//! `component_ready`, `jump_saved`, `generation_complete`, `error` and `pong`
//! messages. Component messages are spaced by the configured pacing delay.

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Value, json};
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use super::prepare_generation;
use crate::core::generation::{ComponentKind, EventKind, GenerationRequest, JumpArtifact, Step};
use crate::core::progress::{self, ProgressiveResult};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Caller;
use crate::interfaces::web::error::ApiError;

/// The socket went away; stop working on its behalf.
struct Disconnected;

pub async fn jumps_realtime_generation(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, caller))
}

async fn send_json(socket: &mut WebSocket, value: Value) -> Result<(), Disconnected> {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .map_err(|_| Disconnected)
}

async fn handle_socket(mut socket: WebSocket, state: AppState, caller: Caller) {
    info!("Realtime client connected ({})", caller.user_id);
    while let Some(msg) = socket.recv().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Realtime socket error: {}", e);
                break;
            }
        };

        let outcome = match serde_json::from_str::<Value>(&text) {
            Ok(message) => dispatch(&mut socket, &state, &caller, message).await,
            Err(e) => {
                send_json(
                    &mut socket,
                    json!({ "type": "error", "message": format!("Message is not JSON: {e}") }),
                )
                .await
            }
        };
        if outcome.is_err() {
            break;
        }
    }
    info!("Realtime client disconnected ({})", caller.user_id);
}

async fn dispatch(
    socket: &mut WebSocket,
    state: &AppState,
    caller: &Caller,
    message: Value,
) -> Result<(), Disconnected> {
    match message.get("type").and_then(Value::as_str) {
        Some("ping") => send_json(socket, json!({ "type": "pong" })).await,
        Some("generate") => {
            let payload = message.get("payload").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<GenerationRequest>(payload) {
                Ok(request) => generate(socket, state, caller, request).await,
                Err(e) => {
                    send_json(
                        socket,
                        json!({ "type": "error", "message": format!("Invalid generate payload: {e}") }),
                    )
                    .await
                }
            }
        }
        other => {
            send_json(
                socket,
                json!({
                    "type": "error",
                    "message": format!("Unknown message type: {}", other.unwrap_or("<missing>")),
                }),
            )
            .await
        }
    }
}

async fn pace(state: &AppState) {
    let delay = state.config.generation.pacing;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

async fn generate(
    socket: &mut WebSocket,
    state: &AppState,
    caller: &Caller,
    request: GenerationRequest,
) -> Result<(), Disconnected> {
    send_json(
        socket,
        json!({ "type": "status", "stage": "validating", "progress": 0, "message": "Validating your request" }),
    )
    .await?;

    let prepared = prepare_generation(
        state,
        caller,
        &request,
        state.config.generation.realtime_policy,
    )
    .await;
    let (sequencer, validated) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            let mut body = e.body();
            body["type"] = json!("error");
            body["message"] = json!(e.to_string());
            return send_json(socket, body).await;
        }
    };

    send_json(
        socket,
        json!({
            "type": "infrastructure_ready",
            "data": {
                "steps": Step::ALL.iter().map(|s| s.task_label()).collect::<Vec<_>>(),
                "policy": sequencer.policy(),
            },
        }),
    )
    .await?;

    let mut state_view = ProgressiveResult::started(Utc::now());
    let mut events = sequencer.stream(validated);

    while let Some(event) = events.next().await {
        state_view = progress::reduce(state_view, &event, Utc::now());

        match event.kind {
            EventKind::Error => {
                send_json(
                    socket,
                    json!({
                        "type": "error",
                        "step": event.step,
                        "message": event.error,
                        "fatal": event.fatal,
                    }),
                )
                .await?;
                if event.fatal {
                    return Ok(());
                }
            }
            EventKind::Complete => {
                return finish(socket, state, caller, &state_view, &event.data).await;
            }
            _ => emit_step(socket, state, &state_view.artifact, event.kind, &event.parse_error).await?,
        }

        send_json(
            socket,
            json!({
                "type": "status",
                "stage": state_view.processing_status.stage,
                "progress": state_view.processing_status.progress,
                "message": state_view.processing_status.current_task,
                "processingStatus": state_view.processing_status,
            }),
        )
        .await?;
    }
    Ok(())
}

async fn emit_step(
    socket: &mut WebSocket,
    state: &AppState,
    artifact: &JumpArtifact,
    kind: EventKind,
    parse_error: &Option<String>,
) -> Result<(), Disconnected> {
    match kind {
        EventKind::Naming => {
            send_json(
                socket,
                json!({ "type": "plan_ready", "section": "title", "data": { "title": artifact.title } }),
            )
            .await
        }
        EventKind::Overview => {
            send_json(
                socket,
                json!({
                    "type": "plan_ready",
                    "section": "overview",
                    "data": {
                        "title": artifact.title,
                        "fullContent": artifact.full_content,
                        "comprehensivePlan": artifact.comprehensive_plan,
                    },
                    "parseError": parse_error,
                }),
            )
            .await
        }
        EventKind::Comprehensive => {
            send_json(
                socket,
                json!({
                    "type": "plan_ready",
                    "section": "structured_plan",
                    "data": { "structuredPlan": artifact.structured_plan },
                    "parseError": parse_error,
                }),
            )
            .await?;
            for kind in [
                ComponentKind::Workflow,
                ComponentKind::Blueprint,
                ComponentKind::Strategy,
            ] {
                let records = artifact.components.records(kind);
                for (index, record) in records.iter().enumerate() {
                    pace(state).await;
                    send_json(
                        socket,
                        json!({
                            "type": "component_ready",
                            "componentType": kind.as_str(),
                            "index": index,
                            "total": records.len(),
                            "data": record,
                        }),
                    )
                    .await?;
                }
            }
            Ok(())
        }
        EventKind::ToolPrompts => {
            let combos = &artifact.components.tool_prompts;
            for (index, combo) in combos.iter().enumerate() {
                pace(state).await;
                send_json(
                    socket,
                    json!({
                        "type": "component_ready",
                        "componentType": ComponentKind::ToolPrompt.as_str(),
                        "index": index,
                        "total": combos.len(),
                        "data": combo,
                    }),
                )
                .await?;
            }
            Ok(())
        }
        EventKind::Error | EventKind::Complete => Ok(()),
    }
}

async fn finish(
    socket: &mut WebSocket,
    state: &AppState,
    caller: &Caller,
    view: &ProgressiveResult,
    summary: &Value,
) -> Result<(), Disconnected> {
    let jump_id = match state.store.save_artifact(&caller.user_id, &view.artifact).await {
        Ok(id) => {
            send_json(socket, json!({ "type": "jump_saved", "jumpId": id })).await?;
            Some(id)
        }
        Err(e) => {
            error!("Failed to save generated jump: {}", e);
            let err = ApiError::from(e);
            send_json(socket, json!({ "type": "error", "message": err.to_string() })).await?;
            None
        }
    };

    send_json(
        socket,
        json!({
            "type": "generation_complete",
            "jumpId": jump_id,
            "title": view.artifact.title,
            "failedSteps": summary.get("failedSteps"),
            "degradedSteps": summary.get("degradedSteps"),
            "warnings": view.warnings,
            "hints": view.hints,
            "stepTimings": view.step_timings,
        }),
    )
    .await
}
