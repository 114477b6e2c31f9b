//! HTTP handlers. Each takes the shared [`AppState`](crate::AppState) and returns JSON.

pub(crate) mod chat;
pub(crate) mod session;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use iip_core::{ChatError, DEFAULT_SESSION_ID};

/// JSON error body `{detail, category}`; validation failures map to 400.
pub(crate) fn error_response(err: &ChatError) -> Response {
    let status = match err {
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    bad_status(status, err.user_message(), err.category())
}

pub(crate) fn bad_status(status: StatusCode, detail: &str, category: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "detail": detail, "category": category })),
    )
        .into_response()
}

/// Request session id, or the shared default when missing or blank.
pub(crate) fn session_or_default(session_id: Option<String>) -> String {
    session_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}
