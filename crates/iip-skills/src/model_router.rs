//! Model Router: sends the system instruction and chat window to an LLM (mock or live API).

use crate::http::{check_status, normalize_base, transport_error};
use iip_core::{ChatError, ChatMessage, CoreConfig, Generator, LlmMode, CONTACT_REQUEST_TEXT};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SKILL_NAME: &str = "ModelRouter";

/// Topics the mock model treats as out of scope (it answers with the contact request).
const MOCK_OUT_OF_SCOPE: &[&str] = &[
    "tuyển dụng",
    "giá đất",
    "đầu tư",
    "mua bán",
    "bất động sản",
    "recruitment",
    "land price",
    "real estate",
];

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Routes a generation call to a deterministic mock or to an OpenAI-compatible
/// `chat/completions` endpoint.
pub struct ModelRouter {
    mode: LlmMode,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ModelRouter {
    /// Mock router; no network access.
    pub fn mock() -> Self {
        Self {
            mode: LlmMode::Mock,
            client: Client::new(),
            base_url: String::new(),
            api_key: None,
            model: "mock".to_string(),
            temperature: 0.0,
        }
    }

    /// Router for the configured mode using the given sampling temperature.
    pub fn from_config(config: &CoreConfig, temperature: f32) -> Self {
        Self {
            mode: config.mode(),
            client: Client::new(),
            base_url: normalize_base(&config.openai_base_url),
            api_key: config.openai_api_key.clone(),
            model: config.chat_model.clone(),
            temperature,
        }
    }

    pub fn mode(&self) -> LlmMode {
        self.mode
    }

    /// Mock LLM: echoes a preview of the question. Out-of-scope questions get the contact
    /// request so the lead flow can be exercised offline.
    fn mock_generate(&self, messages: &[ChatMessage]) -> String {
        let question = messages
            .iter()
            .rev()
            .find(|m| m.is_user())
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        // legal turns put the question on the first line, context after it
        let question = question
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("Câu hỏi:")
            .trim();
        let lower = question.to_lowercase();
        if MOCK_OUT_OF_SCOPE.iter().any(|k| lower.contains(k)) {
            return CONTACT_REQUEST_TEXT.to_string();
        }
        let preview = question
            .chars()
            .take(80)
            .chain(if question.chars().count() > 80 { "…" } else { "" }.chars())
            .collect::<String>();
        format!(
            "[Generated – Mock LLM]\n\nCâu hỏi của anh/chị: \"{}\".\n\nĐây là câu trả lời mô phỏng; bật chế độ live để nhận câu trả lời từ mô hình.",
            preview
        )
    }

    async fn live_generate(
        &self,
        system_instruction: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Auth("openai_api_key is not configured".to_string()))?;

        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(WireMessage {
            role: "system",
            content: system_instruction,
        });
        wire.extend(messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        let body = ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: wire,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: ChatCompletionResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChatError::Internal("completion returned no content".to_string()))
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::mock()
    }
}

#[async_trait::async_trait]
impl Generator for ModelRouter {
    fn name(&self) -> &str {
        SKILL_NAME
    }

    async fn generate(
        &self,
        system_instruction: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ChatError> {
        tracing::debug!(
            target: "iip::skills",
            skill = SKILL_NAME,
            mode = ?self.mode,
            model = %self.model,
            messages = messages.len(),
            "Generating"
        );
        match self.mode {
            LlmMode::Mock => Ok(self.mock_generate(messages)),
            LlmMode::Live => self.live_generate(system_instruction, messages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iip_core::ReplyKind;

    #[tokio::test]
    async fn test_mock_echoes_question_preview() {
        let router = ModelRouter::mock();
        let messages = vec![
            ChatMessage::user("xin chào"),
            ChatMessage::assistant("Xin chào!", ReplyKind::Greeting),
            ChatMessage::user("Câu hỏi: Nghỉ phép năm bao nhiêu ngày?\n\nNội dung liên quan từ tài liệu:\n..."),
        ];
        let text = router.generate("system", &messages).await.unwrap();
        assert!(text.starts_with("[Generated – Mock LLM]"));
        assert!(text.contains("Nghỉ phép năm bao nhiêu ngày?"));
        assert!(!text.contains("Nội dung liên quan"));
    }

    #[tokio::test]
    async fn test_mock_answers_out_of_scope_with_contact_request() {
        let router = ModelRouter::mock();
        let text = router
            .generate("system", &[ChatMessage::user("Giá đất ở Bắc Ninh bao nhiêu?")])
            .await
            .unwrap();
        assert_eq!(text, CONTACT_REQUEST_TEXT);
    }

    #[tokio::test]
    async fn test_live_without_key_is_auth_error() {
        let router = ModelRouter {
            mode: LlmMode::Live,
            base_url: "http://127.0.0.1:9".to_string(),
            ..ModelRouter::mock()
        };
        let err = router
            .generate("system", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.category(), "auth");
    }

    #[test]
    fn test_request_wire_shape() {
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini",
            temperature: 0.7,
            messages: vec![
                WireMessage { role: "system", content: "s" },
                WireMessage { role: "user", content: "q" },
            ],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "q");
        assert_eq!(json["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Theo Điều 113"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Theo Điều 113"));
    }
}
