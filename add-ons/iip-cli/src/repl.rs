//! Line-driven chat session with the contact-collection sub-flow.
//!
//! The REPL is a small state machine: normal chat, then (after a contact-request reply)
//! a required phone prompt and an optional name prompt, then back to chat.

use iip_core::{is_valid_phone, ChatRouter, LeadRecord, TurnContext};
use std::sync::Arc;

pub(crate) const HELP: &str = "\
============================================================
📚 CÁC LỆNH CÓ SẴN:
============================================================
 - exit / quit  : Thoát chương trình
 - clear        : Xóa lịch sử hội thoại
 - status       : Kiểm tra trạng thái chỉ mục tài liệu
 - help         : Hiển thị hướng dẫn này
============================================================";

const SEPARATOR: &str = "------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Exit,
    Clear,
    Status,
    Help,
}

impl Command {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "exit" | "quit" => Some(Command::Exit),
            "clear" => Some(Command::Clear),
            "status" => Some(Command::Status),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

const COMMAND_NAMES: &[&str] = &["exit", "quit", "clear", "status", "help"];

/// Command names starting with `prefix`, for line-editor completion.
pub(crate) fn command_candidates(prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.trim_start().to_lowercase();
    if prefix.contains(char::is_whitespace) {
        return Vec::new();
    }
    COMMAND_NAMES
        .iter()
        .copied()
        .filter(|name| name.starts_with(prefix.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Chat,
    AwaitPhone { question: String },
    AwaitName { question: String, phone: String },
}

/// What the driver should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Print(String),
    Quit(String),
}

pub(crate) struct Repl {
    router: Arc<ChatRouter>,
    session_id: String,
    mode: Mode,
}

impl Repl {
    pub(crate) fn new(router: Arc<ChatRouter>, session_id: impl Into<String>) -> Self {
        Self {
            router,
            session_id: session_id.into(),
            mode: Mode::Chat,
        }
    }

    pub(crate) fn prompt(&self) -> &'static str {
        match self.mode {
            Mode::Chat => "👤 Bạn: ",
            Mode::AwaitPhone { .. } => "Vui lòng nhập SỐ ĐIỆN THOẠI (Bắt buộc): ",
            Mode::AwaitName { .. } => "Vui lòng nhập TÊN (Tùy chọn, Enter để bỏ qua): ",
        }
    }

    pub(crate) fn is_collecting(&self) -> bool {
        self.mode != Mode::Chat
    }

    pub(crate) async fn handle_line(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        match std::mem::replace(&mut self.mode, Mode::Chat) {
            Mode::Chat => self.chat(line).await,
            Mode::AwaitPhone { question } => {
                if is_valid_phone(line) {
                    self.mode = Mode::AwaitName {
                        question,
                        phone: line.to_string(),
                    };
                    Outcome::Print(String::new())
                } else {
                    self.mode = Mode::AwaitPhone { question };
                    Outcome::Print("❌ Số điện thoại không hợp lệ. Vui lòng thử lại.".to_string())
                }
            }
            Mode::AwaitName { question, phone } => self.finish_lead(question, phone, line).await,
        }
    }

    async fn chat(&mut self, line: &str) -> Outcome {
        if line.is_empty() {
            return Outcome::Print(String::new());
        }
        if let Some(command) = Command::parse(line) {
            return self.command(command).await;
        }

        let ctx = TurnContext::new(self.session_id.as_str());
        match self.router.respond(&ctx, line).await {
            Ok(reply) => {
                let mut out = format!("\n🤖 Bot: {}\n\n{}", reply.text, SEPARATOR);
                if reply.is_contact_request() {
                    out.push_str(&format!(
                        "\n📞 BƯỚC THU THẬP THÔNG TIN LIÊN HỆ\n❓ Câu hỏi gốc: '{}'",
                        line
                    ));
                    self.mode = Mode::AwaitPhone {
                        question: line.to_string(),
                    };
                }
                Outcome::Print(out)
            }
            Err(e) => Outcome::Print(format!("❌ {}", e.user_message())),
        }
    }

    async fn command(&self, command: Command) -> Outcome {
        match command {
            Command::Exit => Outcome::Quit("👋 Tạm biệt! Hẹn gặp lại!".to_string()),
            Command::Clear => {
                self.router.clear_session(&self.session_id).await;
                Outcome::Print("🧹 Đã xóa lịch sử hội thoại.".to_string())
            }
            Command::Status => Outcome::Print(self.status().await),
            Command::Help => Outcome::Print(HELP.to_string()),
        }
    }

    pub(crate) async fn status(&self) -> String {
        let mut out = String::from("📊 TRẠNG THÁI CHỈ MỤC TÀI LIỆU\n");
        match self.router.index_stats().await {
            Ok(stats) if stats.ready => {
                out.push_str("✅ Trạng thái: Sẵn sàng\n");
                out.push_str(&format!("📚 Tên Index: {}\n", stats.name));
                out.push_str(&format!("📊 Tổng vectors: {}\n", stats.total_vectors));
                out.push_str(&format!("📏 Dimension: {}", stats.dimension));
            }
            Ok(stats) => out.push_str(&format!("❌ Trạng thái: Chưa sẵn sàng ({} trống)", stats.name)),
            Err(e) => out.push_str(&format!("❌ Trạng thái: Chưa sẵn sàng ({})", e.user_message())),
        }
        out
    }

    async fn finish_lead(&mut self, question: String, phone: String, name: &str) -> Outcome {
        let lead = LeadRecord::new(question, phone).with_name(name);
        let ctx = TurnContext::new(self.session_id.as_str());
        match self.router.complete_lead_capture(&ctx, &lead).await {
            Ok(_) => Outcome::Print(format!(
                "✅ Cảm ơn anh/chị! Chuyên gia của IIP sẽ liên hệ sớm.\n{}\n💬 Tiếp tục cuộc trò chuyện thường (hoặc gõ 'exit' để thoát).",
                SEPARATOR
            )),
            Err(e) => Outcome::Print(format!("❌ {}", e.user_message())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iip_core::{ReplyKind, RouterSettings, SessionStore, GREETING_TEXT};
    use iip_skills::{ModelRouter, SledLeadSheet, VectorSearch};

    fn repl(dir: &tempfile::TempDir) -> (Repl, Arc<SledLeadSheet>) {
        let sheet = Arc::new(SledLeadSheet::open_path(dir.path().join("leads")).unwrap());
        let router = ChatRouter::new(
            Arc::new(SessionStore::new()),
            Arc::new(VectorSearch::mock(5)),
            Arc::new(ModelRouter::mock()),
            Arc::clone(&sheet) as Arc<dyn iip_core::LeadSheet>,
            RouterSettings::default(),
        );
        (Repl::new(Arc::new(router), "chatbot_session"), sheet)
    }

    fn printed(outcome: Outcome) -> String {
        match outcome {
            Outcome::Print(s) => s,
            Outcome::Quit(s) => panic!("unexpected quit: {}", s),
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse(" QUIT "), Some(Command::Exit));
        assert_eq!(Command::parse("status"), Some(Command::Status));
        assert_eq!(Command::parse("clear history"), None);
    }

    #[test]
    fn test_command_candidates() {
        assert_eq!(command_candidates("st"), vec!["status"]);
        assert_eq!(command_candidates("E"), vec!["exit"]);
        assert_eq!(command_candidates("").len(), 5);
        assert!(command_candidates("luật lao").is_empty());
        assert!(command_candidates("xin").is_empty());
    }

    #[tokio::test]
    async fn test_greeting_and_exit() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, _) = repl(&dir);
        let out = printed(repl.handle_line("xin chào").await);
        assert!(out.contains(GREETING_TEXT));
        assert!(matches!(repl.handle_line("exit").await, Outcome::Quit(_)));
    }

    #[tokio::test]
    async fn test_empty_line_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, _) = repl(&dir);
        assert_eq!(repl.handle_line("   ").await, Outcome::Print(String::new()));
        assert!(repl.router.history("chatbot_session").await.is_empty());
    }

    #[tokio::test]
    async fn test_contact_collection_flow() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, sheet) = repl(&dir);

        printed(repl.handle_line("xin chào").await);
        let out = printed(repl.handle_line("Tuyển dụng công nhân ở Bình Dương?").await);
        assert!(out.contains("THU THẬP THÔNG TIN LIÊN HỆ"));
        assert!(repl.is_collecting());

        let retry = printed(repl.handle_line("abc").await);
        assert!(retry.contains("không hợp lệ"));
        assert_eq!(repl.prompt(), "Vui lòng nhập SỐ ĐIỆN THOẠI (Bắt buộc): ");

        printed(repl.handle_line("0912-345-678").await);
        assert_eq!(repl.prompt(), "Vui lòng nhập TÊN (Tùy chọn, Enter để bỏ qua): ");
        let done = printed(repl.handle_line("").await);
        assert!(done.contains("Cảm ơn"));
        assert!(!repl.is_collecting());

        let rows = sheet.rows().unwrap();
        assert_eq!(rows[0][0], "Tuyển dụng công nhân ở Bình Dương?");
        assert_eq!(rows[0][1], "0912-345-678");
        assert_eq!(rows[0][2], "");

        let history = repl.router.history("chatbot_session").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].kind, Some(ReplyKind::Greeting));
    }

    #[tokio::test]
    async fn test_clear_and_status_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (mut repl, _) = repl(&dir);
        printed(repl.handle_line("xin chào").await);
        printed(repl.handle_line("clear").await);
        assert!(repl.router.history("chatbot_session").await.is_empty());

        let status = printed(repl.handle_line("status").await);
        assert!(status.contains("Sẵn sàng"));
        assert!(status.contains("fixture"));
    }
}
