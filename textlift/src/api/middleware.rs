use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::state::AppState;
use crate::error::AppError;

/// Rewrite the body-limit layer's plain-text 413 into the JSON error shape.
///
/// Responses that already carry JSON (from the handlers) pass through.
pub async fn payload_too_large_as_json(
    State(state): State<AppState>,
    response: Response,
) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if is_json {
        return response;
    }

    AppError::PayloadTooLarge {
        max_mib: state.config.server.max_content_length_mib(),
    }
    .into_response()
}
