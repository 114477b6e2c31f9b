//! Session memory: process-wide map of session id -> ordered message log.
//!
//! Each session has its own lock so turns on one session are serialized while different
//! sessions proceed in parallel. The map shard lock is only held long enough to clone the
//! session handle, never across an await.

use crate::intent::is_detail_query;
use crate::shared::{ChatMessage, ReplyKind, DEFLECTION_TEXT};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type SessionLog = Arc<Mutex<Vec<ChatMessage>>>;

/// In-memory history store. Sessions are created on first reference and live until
/// cleared or the process exits.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionLog>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self, session_id: &str) -> SessionLog {
        if let Some(log) = self.sessions.get(session_id) {
            return Arc::clone(log.value());
        }
        Arc::clone(
            self.sessions
                .entry(session_id.to_string())
                .or_default()
                .value(),
        )
    }

    /// Exclusive access to one session's log. Hold it for a whole read-call-append turn.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<Vec<ChatMessage>> {
        self.session(session_id).lock_owned().await
    }

    /// Snapshot of the session's history, creating an empty session if unseen.
    pub async fn get_history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.lock(session_id).await.clone()
    }

    pub async fn append(&self, session_id: &str, message: ChatMessage) {
        self.lock(session_id).await.push(message);
    }

    /// Empties the log in place. Unseen sessions are not created.
    pub async fn clear(&self, session_id: &str) {
        let log = self.sessions.get(session_id).map(|e| Arc::clone(e.value()));
        if let Some(log) = log {
            log.lock().await.clear();
        }
    }

    /// Removes the last turn (assistant, then user). Returns false and leaves the log
    /// untouched when fewer than two messages exist.
    pub async fn rewind_last_turn(&self, session_id: &str) -> bool {
        let log = self.sessions.get(session_id).map(|e| Arc::clone(e.value()));
        match log {
            Some(log) => rewind(&mut *log.lock().await),
            None => false,
        }
    }

    /// Number of sessions seen since startup.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

pub(crate) fn rewind(history: &mut Vec<ChatMessage>) -> bool {
    if history.len() < 2 {
        return false;
    }
    history.pop();
    history.pop();
    true
}

/// Counts earlier detail queries that got a substantive answer.
///
/// A turn counts when the user message is a detail query and the next message is an
/// assistant reply that is neither the deflection text nor an error reply.
pub fn count_prior_detail_answers(history: &[ChatMessage]) -> usize {
    history
        .windows(2)
        .filter(|pair| {
            let (question, reply) = (&pair[0], &pair[1]);
            question.is_user()
                && reply.is_assistant()
                && is_detail_query(&question.content)
                && reply.content.trim() != DEFLECTION_TEXT
                && reply.kind != Some(ReplyKind::Error)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Role;

    fn turn(q: &str, a: &str, kind: ReplyKind) -> [ChatMessage; 2] {
        [ChatMessage::user(q), ChatMessage::assistant(a, kind)]
    }

    #[tokio::test]
    async fn test_get_history_creates_empty_session() {
        let store = SessionStore::new();
        assert!(store.get_history("s1").await.is_empty());
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = SessionStore::new();
        store.append("s1", ChatMessage::user("a")).await;
        store.append("s1", ChatMessage::assistant("b", ReplyKind::Answer)).await;
        let history = store.get_history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "b");
    }

    #[tokio::test]
    async fn test_clear_unseen_session_is_noop() {
        let store = SessionStore::new();
        store.clear("nobody").await;
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_empties_in_place() {
        let store = SessionStore::new();
        store.append("s1", ChatMessage::user("a")).await;
        store.clear("s1").await;
        assert!(store.get_history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_rewind_last_turn() {
        let store = SessionStore::new();
        assert!(!store.rewind_last_turn("s1").await);

        store.append("s1", ChatMessage::user("only")).await;
        assert!(!store.rewind_last_turn("s1").await);
        assert_eq!(store.get_history("s1").await.len(), 1);

        store.append("s1", ChatMessage::assistant("reply", ReplyKind::Answer)).await;
        store.clear("s1").await;
        for m in turn("q", "a", ReplyKind::Answer) {
            store.append("s1", m).await;
        }
        assert!(store.rewind_last_turn("s1").await);
        assert!(store.get_history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_rewind_removes_only_last_pair() {
        let store = SessionStore::new();
        for m in turn("q1", "a1", ReplyKind::Answer)
            .into_iter()
            .chain(turn("q2", "a2", ReplyKind::ContactRequest))
        {
            store.append("s1", m).await;
        }
        store.rewind_last_turn("s1").await;
        let history = store.get_history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "a1");
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_session_stay_paired() {
        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut log = store.lock("shared").await;
                log.push(ChatMessage::user(format!("q{}", i)));
                tokio::task::yield_now().await;
                log.push(ChatMessage::assistant(format!("a{}", i), ReplyKind::Answer));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let history = store.get_history("shared").await;
        assert_eq!(history.len(), 32);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[test]
    fn test_counter_empty_history() {
        assert_eq!(count_prior_detail_answers(&[]), 0);
    }

    #[test]
    fn test_counter_skips_deflections_and_errors() {
        let mut history = Vec::new();
        history.extend(turn("chi tiết về khu công nghiệp A", "A có diện tích 300 ha", ReplyKind::Answer));
        history.extend(turn("chi tiết về khu công nghiệp B", DEFLECTION_TEXT, ReplyKind::Deflect));
        history.extend(turn("chi tiết về khu công nghiệp C", "Xin lỗi...", ReplyKind::Error));
        history.extend(turn("lương tối thiểu vùng 1", "4.960.000 đồng", ReplyKind::Answer));
        assert_eq!(count_prior_detail_answers(&history), 1);
    }

    #[test]
    fn test_counter_ignores_unanswered_trailing_question() {
        let history = vec![ChatMessage::user("chi tiết về khu công nghiệp A")];
        assert_eq!(count_prior_detail_answers(&history), 0);
    }
}
