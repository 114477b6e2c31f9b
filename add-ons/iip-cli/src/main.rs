//! Interactive terminal chat over the same router as the gateway.

mod input;
mod repl;

use input::{Input, LineReader};
use iip_core::{CoreConfig, DEFAULT_SESSION_ID};
use repl::{Outcome, Repl, HELP};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[iip-cli] .env not loaded: {} (using system environment)", e);
    }

    // logs go to stderr so they do not interleave with the prompt
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match CoreConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ LỖI: không đọc được cấu hình: {}", e);
            std::process::exit(1);
        }
    };
    let router = match iip_skills::build_router(&config) {
        Ok(router) => Arc::new(router),
        Err(e) => {
            eprintln!("❌ LỖI: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n============================================================");
    println!("🤖 {} ({:?})", config.app_name.to_uppercase(), config.mode());
    println!("============================================================");
    println!("💬 Trả lời câu hỏi CHUNG về việc làm, nghề nghiệp");
    println!("📜 Tra cứu PHÁP LÝ (Luật, Nghị định, KCN/CCN)");
    println!("{}\n", HELP);

    let mut repl = Repl::new(Arc::clone(&router), DEFAULT_SESSION_ID);
    println!("{}\n", repl.status().await);
    println!("💬 Sẵn sàng! Hãy đặt câu hỏi (gõ 'help' để xem hướng dẫn)\n");

    let mut reader = LineReader::spawn()?;
    loop {
        let line = match reader.read(repl.prompt(), !repl.is_collecting()).await {
            Input::Line(line) => line,
            Input::Interrupted | Input::Eof => {
                println!("\n\n👋 Tạm biệt!");
                break;
            }
        };

        match repl.handle_line(&line).await {
            Outcome::Print(text) if text.is_empty() => {}
            Outcome::Print(text) => println!("{}\n", text),
            Outcome::Quit(text) => {
                println!("\n{}", text);
                break;
            }
        }
    }

    if repl.is_collecting() {
        tracing::warn!(target: "iip::lead", "Exited during contact collection; lead not saved");
    }
    Ok(())
}
