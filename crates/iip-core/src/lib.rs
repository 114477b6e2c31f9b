//! iip-core: chat core library (shared types, normalizer, intent classifier,
//! session memory, response router, lead capture).
//!
//! Collaborators (retrieval, generation, lead sheet) are traits declared here and
//! implemented in `iip-skills`, so the gateway and the CLI share one routing core.

mod error;
mod intent;
mod lead;
mod memory;
mod normalize;
mod orchestrator;
mod shared;

// Shared
pub use shared::{
    ChatMessage, CoreConfig, LlmMode, ReplyKind, Role, TurnContext, CONTACT_REQUEST_TEXT,
    DEFAULT_SESSION_ID, DEFLECTION_TEXT, GREETING_TEXT, NO_INFORMATION_TEXT,
};

// Errors
pub use error::ChatError;

// Normalizer and intent
pub use intent::{is_detail_query, is_greeting, is_legal, Route};
pub use normalize::normalize;

// Session memory
pub use memory::{count_prior_detail_answers, SessionStore};

// Lead capture
pub use lead::{is_valid_phone, LeadRecord, LEAD_SHEET_HEADER};

// Orchestrator
pub use orchestrator::{
    build_context, ChatRouter, Generator, IndexStats, LeadSheet, Passage, Reply, Retriever,
    RouterSettings,
};
