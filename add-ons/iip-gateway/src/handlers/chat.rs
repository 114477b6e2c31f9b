//! Chat turns and lead submissions.
//!
//! `POST /api/v1/chat` runs one router turn and returns the tagged reply. When `kind` is
//! `CONTACT_REQUEST` the widget shows the phone/name form and posts it to `/api/v1/lead`.

use super::{bad_status, error_response, session_or_default};
use crate::AppState;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use iip_core::{is_valid_phone, LeadRecord, TurnContext};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(alias = "question")]
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeadRequest {
    #[serde(default)]
    session_id: Option<String>,
    /// Defaults to the question that triggered the pending contact request.
    #[serde(default)]
    question: Option<String>,
    phone: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn turn_context(session_id: &str) -> TurnContext {
    TurnContext::new(session_id).with_correlation_id(uuid::Uuid::new_v4().to_string())
}

/// POST /api/v1/chat – one conversational turn.
pub(crate) async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let session_id = session_or_default(req.session_id);
    let ctx = turn_context(&session_id);
    tracing::info!(
        target: "iip::gateway",
        session_id = %session_id,
        correlation_id = ?ctx.correlation_id,
        chars = req.message.chars().count(),
        "Chat request received"
    );

    match state.router.respond(&ctx, &req.message).await {
        Ok(reply) => axum::Json(serde_json::json!({
            "answer": reply.text,
            "kind": reply.kind,
            "session_id": session_id,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/lead – stores contact details and closes the contact-request turn.
pub(crate) async fn submit_lead(
    State(state): State<AppState>,
    Json(req): Json<LeadRequest>,
) -> Response {
    let session_id = session_or_default(req.session_id);
    if !is_valid_phone(&req.phone) {
        return bad_status(
            StatusCode::BAD_REQUEST,
            "Số điện thoại không hợp lệ. Vui lòng nhập ít nhất 7 chữ số.",
            "validation",
        );
    }

    let question = match req.question.filter(|q| !q.trim().is_empty()) {
        Some(q) => q,
        None => match state.router.pending_lead_question(&session_id).await {
            Some(q) => q,
            None => {
                return bad_status(
                    StatusCode::BAD_REQUEST,
                    "Không có yêu cầu liên hệ nào đang chờ trong phiên này.",
                    "validation",
                )
            }
        },
    };

    let mut lead = LeadRecord::new(question, req.phone);
    if let Some(name) = req.name {
        lead = lead.with_name(name);
    }
    if let Some(url) = req.url {
        lead = lead.with_url(url);
    }

    match state
        .router
        .complete_lead_capture(&turn_context(&session_id), &lead)
        .await
    {
        Ok(rewound) => axum::Json(serde_json::json!({
            "status": "saved",
            "session_id": session_id,
            "rewound": rewound,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}
