use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};

use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Caller;
use crate::interfaces::web::error::ApiError;

pub async fn get_credits(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Value>, ApiError> {
    let balance = state.store.credit_balance(&caller.user_id).await?;
    Ok(Json(json!({
        "userId": caller.user_id,
        "balance": balance,
        "chargingEnabled": state.config.generation.charge_credits,
    })))
}
