//! Axum-based HTTP gateway for the legal chatbot. Config-driven via CoreConfig.

mod handlers;

use axum::extract::State;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use iip_core::{ChatRouter, CoreConfig};
use std::path::Path as StdPath;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) router: Arc<ChatRouter>,
}

/// Pre-flight check: config loads and validates, lead storage opens, port is free.
fn run_verify() -> Result<(), String> {
    let config = CoreConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Checking configuration ({:?} mode)... ", config.mode());
    config.validate()?;
    println!("OK");

    match config.lead_sheet_webhook.as_deref() {
        Some(url) if !url.trim().is_empty() => println!("Lead sheet: webhook {}", url),
        _ => {
            let path = StdPath::new(&config.storage_path).join("leads");
            print!("Checking lead storage {}... ", path.display());
            let sheet = iip_skills::SledLeadSheet::open_path(&path)
                .map_err(|e| format!("lead storage LOCKED or inaccessible: {}", e))?;
            println!("OK ({} rows)", sheet.len());
        }
    }

    let port = config.port;
    print!("Checking port {}... ", port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} BLOCKED: {}", port, e));
        }
    }

    println!("\n✅ SUCCESS: Ready to start gateway.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[iip-gateway] .env not loaded: {} (using system environment)", e);
    }

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("❌ PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CoreConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("❌ Config load failed: {}", e);
            std::process::exit(1);
        }
    };
    let router = match iip_skills::build_router(&config) {
        Ok(router) => Arc::new(router),
        Err(e) => {
            tracing::error!(target: "iip::gateway", error = %e, "Startup failed");
            eprintln!("❌ Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_app(AppState {
        config: Arc::clone(&config),
        router,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(target: "iip::gateway", "{} listening on {}", config.app_name, addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

fn build_app(state: AppState) -> Router {
    // the chat widget is embedded on third-party pages
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/v1/status", get(status))
        .route("/api/v1/health", get(health))
        .route("/api/v1/chat", post(handlers::chat::chat))
        .route("/api/v1/lead", post(handlers::chat::submit_lead))
        .route(
            "/api/v1/session/:session_id",
            get(handlers::session::get_session).delete(handlers::session::clear_session),
        )
        .with_state(state)
        .layer(cors)
}

/// GET / – human-readable liveness message.
async fn home(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": format!("✅ {} API đang hoạt động.", state.config.app_name)
    }))
}

/// GET /api/v1/health – liveness check for load balancers and scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/status – identity, mode, collaborators and index stats.
async fn status(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let index = match state.router.index_stats().await {
        Ok(stats) => serde_json::json!(stats),
        Err(e) => {
            tracing::warn!(target: "iip::gateway", category = e.category(), error = %e, "Index stats unavailable");
            serde_json::json!({ "ready": false, "error": e.category() })
        }
    };
    let settings = state.router.settings();
    let collaborators: serde_json::Map<String, serde_json::Value> = state
        .router
        .collaborators()
        .iter()
        .map(|(role, name)| (role.to_string(), serde_json::json!(name)))
        .collect();

    axum::Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "llm_mode": format!("{:?}", state.config.mode()).to_lowercase(),
        "chat_model": state.config.chat_model,
        "sessions": state.router.sessions().session_count(),
        "router": {
            "context_max_chars": settings.context_max_chars,
            "history_window": settings.history_window,
            "request_timeout_secs": settings.request_timeout.as_secs(),
        },
        "collaborators": collaborators,
        "index": index,
    }))
}
