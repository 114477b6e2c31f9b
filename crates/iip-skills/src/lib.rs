//! Concrete collaborators for the chat core, and the wiring shared by the binaries.

mod http;
mod lead_sheet;
mod model_router;
mod vector_search;

pub use lead_sheet::{SledLeadSheet, WebhookLeadSheet};
pub use model_router::ModelRouter;
pub use vector_search::VectorSearch;

use iip_core::{ChatRouter, CoreConfig, LeadSheet, RouterSettings, SessionStore};
use std::path::Path;
use std::sync::Arc;

/// Builds the router for the configured mode: one generator per temperature, the vector
/// retriever, and the webhook sheet when configured (sled under `storage_path` otherwise).
pub fn build_router(config: &CoreConfig) -> Result<ChatRouter, Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    let lead_sheet: Arc<dyn LeadSheet> = match config.lead_sheet_webhook.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Arc::new(WebhookLeadSheet::new(url)),
        _ => Arc::new(SledLeadSheet::open_path(Path::new(&config.storage_path).join("leads"))?),
    };
    let retriever = Arc::new(VectorSearch::from_config(config));
    let legal = Arc::new(ModelRouter::from_config(config, config.legal_temperature));
    let general = Arc::new(ModelRouter::from_config(config, config.general_temperature));

    tracing::info!(
        target: "iip::skills",
        mode = ?legal.mode(),
        model = %config.chat_model,
        index = %config.pinecone_index_name,
        lead_sheet = lead_sheet.name(),
        "Collaborators ready"
    );

    Ok(ChatRouter::new(
        Arc::new(SessionStore::new()),
        retriever,
        legal,
        lead_sheet,
        RouterSettings::from_config(config),
    )
    .with_general_generator(general))
}
