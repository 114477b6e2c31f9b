//! Error taxonomy for chat turns and collaborator calls.

use thiserror::Error;

/// Failures surfaced by the router and its collaborators.
///
/// Only `Validation` ever reaches a caller as an `Err`; every other variant is turned into a
/// user-safe reply via [`ChatError::user_message`] and appended to history like any answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("request timed out")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Heuristic classification from free-form error text (SDK messages, response bodies).
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["401", "403", "unauthorized", "forbidden", "invalid_api_key", "api key", "authentication"]) {
            ChatError::Auth(message)
        } else if has(&["429", "rate limit", "rate_limit", "too many requests", "quota"]) {
            ChatError::RateLimited(message)
        } else if has(&["timeout", "timed out", "deadline"]) {
            ChatError::Timeout
        } else if has(&[
            "connection",
            "connect",
            "unavailable",
            "502",
            "503",
            "504",
            "dns",
            "index not found",
            "not loaded",
        ]) {
            ChatError::UpstreamUnavailable(message)
        } else {
            ChatError::Internal(message)
        }
    }

    /// Maps an HTTP status returned by a collaborator backend.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => ChatError::Auth(format!("status {}: {}", status, body)),
            429 => ChatError::RateLimited(format!("status {}: {}", status, body)),
            408 | 504 => ChatError::Timeout,
            500..=599 => ChatError::UpstreamUnavailable(format!("status {}: {}", status, body)),
            _ => ChatError::classify(format!("status {}: {}", status, body)),
        }
    }

    /// Short category label for logs and JSON error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation",
            ChatError::UpstreamUnavailable(_) => "upstream_unavailable",
            ChatError::Auth(_) => "auth",
            ChatError::RateLimited(_) => "rate_limited",
            ChatError::Timeout => "timeout",
            ChatError::Internal(_) => "internal",
        }
    }

    /// Localized text safe to show in the chat. Never includes the underlying detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "Thiếu câu hỏi.",
            ChatError::UpstreamUnavailable(_) => {
                "Xin lỗi, hệ thống tra cứu tạm thời không khả dụng. Vui lòng thử lại sau."
            }
            ChatError::Auth(_) => {
                "Xin lỗi, hệ thống đang gặp sự cố xác thực với dịch vụ AI. Vui lòng liên hệ quản trị viên."
            }
            ChatError::RateLimited(_) => "Xin lỗi, hệ thống đang quá tải. Vui lòng thử lại sau ít phút.",
            ChatError::Timeout => "Xin lỗi, yêu cầu xử lý quá thời gian cho phép. Vui lòng thử lại.",
            ChatError::Internal(_) => "Xin lỗi, tôi gặp lỗi khi xử lý câu hỏi. Vui lòng thử lại.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_error_text() {
        assert_eq!(ChatError::classify("Incorrect API key provided").category(), "auth");
        assert_eq!(ChatError::classify("Rate limit reached for gpt-4o").category(), "rate_limited");
        assert_eq!(ChatError::classify("operation timed out").category(), "timeout");
        assert_eq!(ChatError::classify("connection refused").category(), "upstream_unavailable");
        assert_eq!(ChatError::classify("unexpected token in JSON").category(), "internal");
    }

    #[test]
    fn test_from_status() {
        assert_eq!(ChatError::from_status(401, "").category(), "auth");
        assert_eq!(ChatError::from_status(429, "").category(), "rate_limited");
        assert_eq!(ChatError::from_status(503, "").category(), "upstream_unavailable");
        assert_eq!(ChatError::from_status(504, "").category(), "timeout");
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = ChatError::Auth("sk-live-secret rejected".to_string());
        assert!(!err.user_message().contains("sk-live"));
    }
}
