use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde_json::{Value, json};

use crate::core::generation::ToolPromptCombo;
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Caller;
use crate::interfaces::web::error::ApiError;

pub async fn list_jumps(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    let jumps = state.store.list_jumps(&caller.user_id).await?;
    Ok(Json(json!({ "jumps": jumps })))
}

pub async fn get_jump(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    let jump = state.store.get_jump(&caller.user_id, &id).await?;
    Ok(Json(json!({ "jump": jump })))
}

pub async fn delete_jump(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_jump(&caller.user_id, &id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_tool_prompts(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    let prompts = state.store.list_tool_prompts(&caller.user_id, &id).await?;
    Ok(Json(json!({ "toolPrompts": prompts })))
}

pub async fn upsert_tool_prompt(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<ToolPromptCombo>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(combo) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if combo.tool_name.trim().is_empty() || combo.prompt_text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "toolName and promptText are required".to_string(),
        ));
    }
    let stored = state
        .store
        .upsert_tool_prompt(&caller.user_id, &id, &combo)
        .await?;
    Ok(Json(json!({ "toolPrompt": stored })))
}

pub async fn delete_tool_prompt(
    Path((id, tool_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .delete_tool_prompt(&caller.user_id, &id, &tool_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_components(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    let components = state.store.list_components(&caller.user_id, &id).await?;
    Ok(Json(json!({ "components": components })))
}
