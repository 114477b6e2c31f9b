//! Mapping of HTTP transport and status failures into [`ChatError`].

use iip_core::ChatError;

pub(crate) fn transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else if e.is_connect() {
        ChatError::UpstreamUnavailable(e.to_string())
    } else if e.is_decode() {
        ChatError::Internal(format!("malformed response: {}", e))
    } else {
        ChatError::classify(e.to_string())
    }
}

/// Passes successful responses through; otherwise reads the body and maps the status.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unreadable body".to_string());
    Err(ChatError::from_status(status.as_u16(), truncate(&body, 300)))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).chain("…".chars()).collect()
    }
}

/// Adds `https://` when a host is configured without a scheme and strips trailing slashes.
pub(crate) fn normalize_base(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("laws-abc.svc.pinecone.io/"), "https://laws-abc.svc.pinecone.io");
        assert_eq!(normalize_base("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn test_truncate_long_bodies() {
        let body = "x".repeat(400);
        assert_eq!(truncate(&body, 300).chars().count(), 301);
        assert_eq!(truncate("short", 300), "short");
    }
}
