//! `POST /functions/v1/jumps-ai-streaming`: one StepResult per SSE frame.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use super::prepare_generation;
use crate::core::generation::{EventKind, GenerationRequest, JumpArtifact, StepResult};
use crate::core::store::ArtifactStore;
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Caller;
use crate::interfaces::web::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StreamingBody {
    #[serde(rename = "formData", alias = "form_data")]
    pub form_data: GenerationRequest,
}

pub async fn jumps_ai_streaming(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<StreamingBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (sequencer, request) = prepare_generation(
        &state,
        &caller,
        &body.form_data,
        state.config.generation.sse_policy,
    )
    .await?;

    info!(
        "SSE generation started for {} ({:?})",
        caller.user_id,
        sequencer.policy()
    );
    let events = sequencer.stream(request);
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(16);
    tokio::spawn(relay(events, state.store.clone(), caller.user_id, tx));

    Ok(Sse::new(ReceiverStream::new(rx)).into_response())
}

/// Forward sequencer events as frames. The finished artifact is saved before
/// the `complete` frame goes out so that frame can carry `jumpId`.
async fn relay(
    mut events: ReceiverStream<StepResult>,
    store: ArtifactStore,
    owner: String,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    let mut artifact = JumpArtifact::default();

    while let Some(mut event) = events.next().await {
        artifact.apply_event(&event);

        if event.kind == EventKind::Complete {
            let saved = store.save_artifact(&owner, &artifact).await;
            if let Some(data) = event.data.as_object_mut() {
                match saved {
                    Ok(jump_id) => {
                        data.insert("jumpId".to_string(), json!(jump_id));
                    }
                    Err(e) => {
                        error!("Failed to save generated jump: {}", e);
                        data.insert("saveError".to_string(), json!(e.to_string()));
                    }
                }
            }
        }

        let terminal = event.is_terminal();
        let frame = match Event::default().json_data(&event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode SSE frame: {}", e);
                continue;
            }
        };
        if tx.send(Ok(frame)).await.is_err() {
            info!("SSE client disconnected at step {}", event.step);
            return;
        }
        if terminal {
            break;
        }
    }
}
