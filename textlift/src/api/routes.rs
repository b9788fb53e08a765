use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::frontend;
use super::handlers;
use super::middleware::payload_too_large_as_json;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The body limit sits in front of every handler; oversized requests never
    // reach the upload code.
    let body_limit = state.config.server.max_content_length;

    Router::new()
        .route("/", get(frontend::serve_root))
        .route("/static/{*path}", get(frontend::serve_path))
        .route("/health", get(handlers::health_check))
        .route("/extract_text", post(handlers::extract_text))
        .route("/download/{filename}", get(handlers::download_file))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::map_response_with_state(
            state.clone(),
            payload_too_large_as_json,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
