//! Shared types used across all IIP crates.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session used by the CLI and by gateway requests that omit `session_id`.
pub const DEFAULT_SESSION_ID: &str = "chatbot_session";

/// Fixed greeting returned for greeting/meta messages. Compared by value downstream; do not edit.
pub const GREETING_TEXT: &str = "Xin chào! Mình là Chatbot Cổng việc làm Việt Nam. Mình có thể giúp anh/chị tra cứu và giải thích các quy định pháp luật (luật, nghị định, thông tư...) liên quan đến lao động, việc làm, dân sự và các lĩnh vực pháp lý khác. Gõ câu hỏi cụ thể hoặc mô tả tình huống nhé — mình sẽ trả lời ngắn gọn, có dẫn nguồn.";

/// Canned answer for the second and later detail queries in a session.
/// The repeat counter recognises earlier deflections by exact equality with this text.
pub const DEFLECTION_TEXT: &str =
    "Nếu bạn muốn biết thêm thông tin chi tiết về các cụm, hãy truy cập vào website https://iipmap.com/.";

/// Out-of-scope reply; emitting it starts the lead-capture sub-flow.
pub const CONTACT_REQUEST_TEXT: &str = "Anh/chị vui lòng để lại tên và số điện thoại, chuyên gia của IIP sẽ liên hệ và giải đáp các yêu cầu của anh/chị ạ.";

/// Returned when retrieval yields zero passages.
pub const NO_INFORMATION_TEXT: &str =
    "Xin lỗi, tôi không tìm thấy thông tin liên quan trong dữ liệu hiện có.";

/// Upper bound for the number of history messages sent to the generator.
pub(crate) const MAX_HISTORY_WINDOW: usize = 10;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Which path produced an assistant reply. Callers switch on this instead of comparing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyKind {
    /// Fixed greeting, no collaborator call.
    Greeting,
    /// Fixed deflection for a repeated detail query.
    Deflect,
    /// Contact request; the caller should collect phone/name next.
    ContactRequest,
    /// Generated answer (legal or general path).
    Answer,
    /// Retrieval returned no passages.
    NoInformation,
    /// A collaborator failed; the text is a user-safe error message.
    Error,
}

/// One entry of a session's history. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Set on assistant messages produced by the router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReplyKind>,
    /// Text as typed, kept on user messages when it differs from the normalized `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            kind: None,
            raw: None,
        }
    }

    pub fn assistant(content: impl Into<String>, kind: ReplyKind) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            kind: Some(kind),
            raw: None,
        }
    }

    /// Records the text as the user typed it; dropped when identical to `content`.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let raw = raw.trim();
        self.raw = Some(raw.to_string()).filter(|r| *r != self.content);
        self
    }

    /// The user's own wording: `raw` when recorded, otherwise `content`.
    pub fn as_typed(&self) -> &str {
        self.raw.as_deref().unwrap_or(&self.content)
    }

    #[inline]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    #[inline]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Per-turn context carried into tracing spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    pub session_id: String,
    /// Optional correlation id for request tracing.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Resolved session id (never empty).
    pub fn resolved_session_id(&self) -> &str {
        Some(self.session_id.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
    }
}

/// Collaborator mode: mock (deterministic, offline) or live (external APIs).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "live" => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }
}

/// Global application configuration (gateway, CLI and collaborators). Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity shown by status endpoints and the CLI banner.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Base directory for local data (the sled lead sheet lives under it).
    pub storage_path: String,
    /// "mock" or "live".
    pub llm_mode: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Temperature for the legal (retrieval-augmented) path.
    pub legal_temperature: f32,
    /// Temperature for the general-assistant path.
    pub general_temperature: f32,

    #[serde(default)]
    pub pinecone_api_key: Option<String>,
    /// Data-plane host of the index, e.g. `https://laws-abc123.svc.aped-1234.pinecone.io`.
    #[serde(default)]
    pub pinecone_index_host: Option<String>,
    pub pinecone_index_name: String,

    /// Number of passages requested from the retriever.
    pub top_k: usize,
    /// Character budget for the context handed to the generator.
    pub context_max_chars: usize,
    /// History messages sent with each generation call (clamped to 10).
    pub history_window: usize,
    /// Timeout applied to each retrieval and generation call.
    pub request_timeout_secs: u64,

    /// When set, lead rows are POSTed here instead of the local sled sheet.
    #[serde(default)]
    pub lead_sheet_webhook: Option<String>,
}

impl CoreConfig {
    pub fn mode(&self) -> LlmMode {
        LlmMode::parse(&self.llm_mode)
    }

    /// History window actually used by the router.
    pub fn effective_history_window(&self) -> usize {
        self.history_window.min(MAX_HISTORY_WINDOW)
    }

    /// Load config from file and environment. Precedence: env `IIP_*` > file (`IIP_CONFIG` path or `config/gateway.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("IIP_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Chatbot Cổng việc làm Việt Nam")?
            .set_default("port", 10000_i64)?
            .set_default("storage_path", "./data")?
            .set_default("llm_mode", "mock")?
            .set_default("openai_base_url", "https://api.openai.com/v1")?
            .set_default("chat_model", "gpt-4o-mini")?
            .set_default("embedding_model", "text-embedding-3-large")?
            .set_default("legal_temperature", 0.0_f64)?
            .set_default("general_temperature", 0.7_f64)?
            .set_default("pinecone_index_name", "iip-legal")?
            .set_default("top_k", 15_i64)?
            .set_default("context_max_chars", 6000_i64)?
            .set_default("history_window", 10_i64)?
            .set_default("request_timeout_secs", 30_i64)?;

        let path = Path::new(&config_path);
        let with_ext = path.with_extension("toml");
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else if with_ext.exists() {
            builder.add_source(config::File::from(with_ext.as_path()))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("IIP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        built.try_deserialize()
    }

    /// Startup check: live mode needs credentials for both the generator and the retrieval backend.
    /// Returns the list of missing keys as a diagnostic.
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.llm_mode.trim().to_lowercase().as_str(), "mock" | "live") {
            return Err(format!(
                "llm_mode must be \"mock\" or \"live\", got {:?} (set IIP_LLM_MODE)",
                self.llm_mode
            ));
        }
        if self.mode() == LlmMode::Mock {
            return Ok(());
        }
        let missing: Vec<&str> = [
            ("openai_api_key", &self.openai_api_key),
            ("pinecone_api_key", &self.pinecone_api_key),
            ("pinecone_index_host", &self.pinecone_index_host),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().map(str::trim).unwrap_or("").is_empty())
        .map(|(k, _)| k)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "live mode requires {} (set IIP_{} or add them to the config file)",
                missing.join(", "),
                missing[0].to_uppercase()
            ))
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> CoreConfig {
    CoreConfig {
        app_name: "Test Chatbot".to_string(),
        port: 10000,
        storage_path: "./data".to_string(),
        llm_mode: "mock".to_string(),
        openai_api_key: None,
        openai_base_url: "https://api.openai.com/v1".to_string(),
        chat_model: "gpt-4o-mini".to_string(),
        embedding_model: "text-embedding-3-large".to_string(),
        legal_temperature: 0.0,
        general_temperature: 0.7,
        pinecone_api_key: None,
        pinecone_index_host: None,
        pinecone_index_name: "iip-legal".to_string(),
        top_k: 15,
        context_max_chars: 6000,
        history_window: 10,
        request_timeout_secs: 30,
        lead_sheet_webhook: None,
    }
}
