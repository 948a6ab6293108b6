use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::AppState;
use crate::core::store::GUEST_USER;

/// Who is calling, attached to every request as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Caller {
    pub(crate) user_id: String,
    pub(crate) authenticated: bool,
}

impl Caller {
    pub(crate) fn guest() -> Self {
        Self {
            user_id: GUEST_USER.to_string(),
            authenticated: false,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Resolve the bearer token to a user. Missing or unknown tokens make the
/// caller a guest, except on `/api/` routes of a server bound to a
/// non-loopback address, which require a valid token.
pub(crate) async fn resolve_caller(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let caller = match bearer_token(req.headers()) {
        Some(raw) => match state.store.user_for_token(raw).await {
            Ok(Some(user_id)) => Caller {
                user_id,
                authenticated: true,
            },
            Ok(None) => {
                warn!("Unknown bearer token, treating caller as guest");
                Caller::guest()
            }
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": e.to_string() })),
                )
                    .into_response();
            }
        },
        None => Caller::guest(),
    };

    let path = req.uri().path();
    let dashboard_route = path.starts_with("/api/") && path != "/api/health";
    if !caller.authenticated && dashboard_route && !state.config.is_loopback() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "A valid API token is required when the server is exposed on a non-loopback address. Use: Bearer <token>"
            })),
        )
            .into_response();
    }

    req.extensions_mut().insert(caller);
    next.run(req).await
}
