use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{credits, jumps, realtime, streaming, system};
use super::{AppState, auth};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    let generation_routes = Router::new()
        .route(
            "/functions/v1/jumps-ai-streaming",
            post(streaming::jumps_ai_streaming),
        )
        .route(
            "/functions/v1/jumps-realtime-generation",
            get(realtime::jumps_realtime_generation),
        );

    let dashboard_routes = Router::new()
        .route("/api/health", get(system::health))
        .route("/api/jumps", get(jumps::list_jumps))
        .route(
            "/api/jumps/{id}",
            get(jumps::get_jump).delete(jumps::delete_jump),
        )
        .route(
            "/api/jumps/{id}/tool-prompts",
            get(jumps::list_tool_prompts).put(jumps::upsert_tool_prompt),
        )
        .route(
            "/api/jumps/{id}/tool-prompts/{tool_id}",
            delete(jumps::delete_tool_prompt),
        )
        .route("/api/jumps/{id}/components", get(jumps::list_components))
        .route("/api/credits", get(credits::get_credits))
        .route("/api/logs", get(super::sse_logs_endpoint));

    generation_routes
        .merge(dashboard_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_caller,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.config.api_port))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}
