//! Response router: picks a path per turn, calls collaborators, records the turn.

mod context;
mod prompts;

pub use context::build_context;

use crate::error::ChatError;
use crate::intent::Route;
use crate::lead::{is_valid_phone, LeadRecord};
use crate::memory::{rewind, SessionStore};
use crate::normalize::normalize;
use crate::shared::{
    ChatMessage, CoreConfig, ReplyKind, TurnContext, CONTACT_REQUEST_TEXT, DEFLECTION_TEXT,
    GREETING_TEXT, MAX_HISTORY_WINDOW, NO_INFORMATION_TEXT,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One ranked passage returned by the retriever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub page: Option<String>,
}

/// Summary of the retrieval index, shown by `status` surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub name: String,
    pub total_vectors: u64,
    pub dimension: u32,
    pub ready: bool,
}

/// Retrieval backend over the legal corpus.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    /// Top-ranked passages for the query, best first. May be empty.
    async fn search(&self, query: &str) -> Result<Vec<Passage>, ChatError>;

    async fn stats(&self) -> Result<IndexStats, ChatError>;
}

/// Text generation backend.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// Generates a reply to `messages` under `system_instruction`. Only role and content
    /// of each message are sent.
    async fn generate(
        &self,
        system_instruction: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ChatError>;
}

/// Append-only sheet receiving lead rows.
#[async_trait::async_trait]
pub trait LeadSheet: Send + Sync {
    fn name(&self) -> &str;

    async fn append_row(&self, fields: &[String]) -> Result<(), ChatError>;
}

/// Tagged router output. Callers switch on `kind`; `text` is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    pub fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Tags generated text. The model is instructed to emit the contact and deflection
    /// texts verbatim, so those are recognised here and nowhere else.
    pub fn from_generated(text: String) -> Self {
        let kind = match text.trim() {
            t if t == CONTACT_REQUEST_TEXT => ReplyKind::ContactRequest,
            t if t == DEFLECTION_TEXT => ReplyKind::Deflect,
            _ => ReplyKind::Answer,
        };
        Self { kind, text }
    }

    #[inline]
    pub fn is_contact_request(&self) -> bool {
        self.kind == ReplyKind::ContactRequest
    }
}

/// Router knobs derived from [`CoreConfig`].
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Character budget for the assembled legal context.
    pub context_max_chars: usize,
    /// History messages sent with each generation call (at most 10).
    pub history_window: usize,
    /// Applied separately to each retrieval and generation call.
    pub request_timeout: Duration,
}

impl RouterSettings {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            context_max_chars: config.context_max_chars,
            history_window: config.effective_history_window(),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            context_max_chars: 6000,
            history_window: MAX_HISTORY_WINDOW,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Owns the session store and the collaborators; one instance serves every session.
pub struct ChatRouter {
    sessions: Arc<SessionStore>,
    retriever: Arc<dyn Retriever>,
    legal_generator: Arc<dyn Generator>,
    general_generator: Arc<dyn Generator>,
    lead_sheet: Arc<dyn LeadSheet>,
    settings: RouterSettings,
}

impl ChatRouter {
    pub fn new(
        sessions: Arc<SessionStore>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        lead_sheet: Arc<dyn LeadSheet>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            sessions,
            retriever,
            general_generator: Arc::clone(&generator),
            legal_generator: generator,
            lead_sheet,
            settings,
        }
    }

    /// Uses a separate generator (e.g. a warmer temperature) for the general path.
    pub fn with_general_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.general_generator = generator;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Runs one turn: normalize, route, call collaborators, append the turn.
    ///
    /// The session lock is held from the history read to the append, so concurrent turns
    /// on one session never interleave. Collaborator failures become an `Error` reply that
    /// is still recorded; only an empty question returns `Err`, and then history is untouched.
    pub async fn respond(&self, ctx: &TurnContext, message: &str) -> Result<Reply, ChatError> {
        let question = normalize(message);
        if question.is_empty() {
            return Err(ChatError::Validation("question is empty after normalization".to_string()));
        }
        let session_id = ctx.resolved_session_id();
        let mut history = self.sessions.lock(session_id).await;

        let route = Route::select(&question, &history);
        tracing::info!(
            target: "iip::router",
            session_id,
            correlation_id = ?ctx.correlation_id,
            route = route.as_str(),
            history_len = history.len(),
            "Routing turn"
        );

        let reply = match route {
            Route::Greeting => Reply::new(ReplyKind::Greeting, GREETING_TEXT),
            Route::DeflectDetail => Reply::new(ReplyKind::Deflect, DEFLECTION_TEXT),
            Route::LegalAnswer => self
                .legal_answer(&question, &history)
                .await
                .unwrap_or_else(|e| error_reply(session_id, route, e)),
            Route::GeneralAnswer => self
                .general_answer(&question, &history)
                .await
                .unwrap_or_else(|e| error_reply(session_id, route, e)),
        };

        history.push(ChatMessage::user(question).with_raw(message));
        history.push(ChatMessage::assistant(reply.text.clone(), reply.kind));
        tracing::debug!(
            target: "iip::router",
            session_id,
            kind = ?reply.kind,
            history_len = history.len(),
            "Turn recorded"
        );
        Ok(reply)
    }

    async fn legal_answer(&self, question: &str, history: &[ChatMessage]) -> Result<Reply, ChatError> {
        let passages = self.with_timeout(self.retriever.search(question)).await?;
        tracing::debug!(
            target: "iip::router",
            retriever = self.retriever.name(),
            hits = passages.len(),
            "Retrieved passages"
        );
        if passages.is_empty() {
            return Ok(Reply::new(ReplyKind::NoInformation, NO_INFORMATION_TEXT));
        }

        let context = build_context(&passages, self.settings.context_max_chars);
        let mut messages = self.window(history).to_vec();
        messages.push(ChatMessage::user(prompts::legal_user_turn(question, &context)));

        let text = self
            .with_timeout(
                self.legal_generator
                    .generate(prompts::legal_system_instruction(), &messages),
            )
            .await?;
        Ok(Reply::from_generated(text))
    }

    async fn general_answer(&self, question: &str, history: &[ChatMessage]) -> Result<Reply, ChatError> {
        let mut messages = self.window(history).to_vec();
        messages.push(ChatMessage::user(question));
        let text = self
            .with_timeout(
                self.general_generator
                    .generate(prompts::general_system_instruction(), &messages),
            )
            .await?;
        Ok(Reply::from_generated(text))
    }

    fn window<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let n = self.settings.history_window.min(MAX_HISTORY_WINDOW);
        &history[history.len().saturating_sub(n)..]
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, ChatError>>,
    ) -> Result<T, ChatError> {
        match tokio::time::timeout(self.settings.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Timeout),
        }
    }

    /// Persists a lead, then drops the contact-request turn from history.
    ///
    /// Sheet failures are logged and swallowed. The rewind only happens when the session's
    /// last reply is still the contact request, so a stale or repeated submission cannot
    /// remove an unrelated turn. Returns whether history was rewound.
    pub async fn complete_lead_capture(
        &self,
        ctx: &TurnContext,
        lead: &LeadRecord,
    ) -> Result<bool, ChatError> {
        if !is_valid_phone(&lead.phone) {
            return Err(ChatError::Validation(
                "phone must be at least 7 digits, spaces or hyphens".to_string(),
            ));
        }
        let session_id = ctx.resolved_session_id();
        let row = lead.to_row(chrono::Local::now());
        match self.with_timeout(self.lead_sheet.append_row(&row)).await {
            Ok(()) => tracing::info!(
                target: "iip::lead",
                session_id,
                sheet = self.lead_sheet.name(),
                has_name = lead.name.is_some(),
                "Lead saved"
            ),
            Err(e) => tracing::warn!(
                target: "iip::lead",
                session_id,
                sheet = self.lead_sheet.name(),
                category = e.category(),
                error = %e,
                "Lead row not persisted"
            ),
        }

        let mut history = self.sessions.lock(session_id).await;
        let pending = history
            .last()
            .is_some_and(|m| m.kind == Some(ReplyKind::ContactRequest));
        let rewound = pending && rewind(&mut *history);
        tracing::debug!(target: "iip::lead", session_id, rewound, "Lead capture finished");
        Ok(rewound)
    }

    /// The question that triggered a pending contact request, as the user typed it, if the
    /// session is waiting for one.
    pub async fn pending_lead_question(&self, session_id: &str) -> Option<String> {
        let history = self.sessions.lock(session_id).await;
        match history.as_slice() {
            [.., question, reply] if reply.kind == Some(ReplyKind::ContactRequest) => {
                Some(question.as_typed().to_string())
            }
            _ => None,
        }
    }

    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions.get_history(session_id).await
    }

    pub async fn clear_session(&self, session_id: &str) {
        self.sessions.clear(session_id).await;
        tracing::info!(target: "iip::router", session_id, "Session cleared");
    }

    pub async fn index_stats(&self) -> Result<IndexStats, ChatError> {
        self.with_timeout(self.retriever.stats()).await
    }

    /// Collaborator names, for status output.
    pub fn collaborators(&self) -> [(&'static str, &str); 4] {
        [
            ("retriever", self.retriever.name()),
            ("legal_generator", self.legal_generator.name()),
            ("general_generator", self.general_generator.name()),
            ("lead_sheet", self.lead_sheet.name()),
        ]
    }
}

fn error_reply(session_id: &str, route: Route, error: ChatError) -> Reply {
    tracing::warn!(
        target: "iip::router",
        session_id,
        route = route.as_str(),
        category = error.category(),
        error = %error,
        "Collaborator call failed"
    );
    Reply::new(ReplyKind::Error, error.user_message())
}
