use crate::AppState;
use axum::extract::{Path, State};

/// GET /api/v1/session/:session_id – the session's history, oldest first.
pub(crate) async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> axum::Json<serde_json::Value> {
    let history = state.router.history(&session_id).await;
    axum::Json(serde_json::json!({
        "session_id": session_id,
        "count": history.len(),
        "messages": history,
    }))
}

/// DELETE /api/v1/session/:session_id – empties the session's history.
pub(crate) async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> axum::Json<serde_json::Value> {
    state.router.clear_session(&session_id).await;
    axum::Json(serde_json::json!({ "status": "cleared", "session_id": session_id }))
}
