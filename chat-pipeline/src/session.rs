use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

/// Seeds every new conversation. The assistant must answer in Vietnamese and
/// stick to the supplied evidence.
pub const SYSTEM_PROMPT: &str = "Bạn là trợ lý ảo MovieDB chuyên về phim ảnh. Bạn có khả năng nhớ các câu hỏi trước đó trong cuộc trò chuyện. Chỉ dùng dữ liệu được cung cấp để trả lời một cách chính xác và chi tiết. BẮT BUỘC trả lời bằng tiếng Việt. Nếu người dùng hỏi về thông tin từ câu hỏi trước, hãy tham khảo lịch sử hội thoại. Khi trả lời, hãy luôn dựa trên dữ liệu được cung cấp và không bịa ra thông tin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
}

impl SessionMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// One conversation's history. The system prompt stays pinned at index zero;
/// pushes evict the oldest turns beyond it once the cap is reached.
#[derive(Debug)]
pub struct SessionState {
    messages: Vec<SessionMessage>,
    max_history: usize,
}

impl SessionState {
    fn seeded(max_history: usize) -> Self {
        Self {
            messages: vec![SessionMessage::system(SYSTEM_PROMPT)],
            max_history,
        }
    }

    pub fn messages(&self) -> &[SessionMessage] {
        &self.messages
    }

    pub fn push_user(&mut self, content: String) {
        self.messages.push(SessionMessage::user(content));
        self.trim();
    }

    pub fn push_assistant(&mut self, content: String) {
        self.messages.push(SessionMessage::assistant(content));
        self.trim();
    }

    fn trim(&mut self) {
        let excess = self.messages.len().saturating_sub(self.max_history + 1);
        if excess > 0 {
            self.messages.drain(1..1 + excess);
        }
    }
}

struct SessionEntry {
    state: Arc<Mutex<SessionState>>,
    last_used: Instant,
}

/// In-memory conversation store keyed by session id.
///
/// Each session sits behind its own async mutex so concurrent requests for
/// the same session serialize instead of interleaving their history writes.
/// Sessions idle longer than the TTL are dropped lazily on the next
/// checkout; a request already holding a state handle keeps it until done.
pub struct SessionStore {
    sessions: StdMutex<HashMap<String, SessionEntry>>,
    max_history: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_history: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: StdMutex::new(HashMap::new()),
            max_history,
            idle_ttl,
        }
    }

    /// Returns the session's state handle, creating and seeding it on first
    /// use.
    pub fn checkout(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_used.elapsed() <= self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "Dropped idle chat sessions");
        }

        let entry = sessions
            .entry(session_id.to_owned())
            .or_insert_with(|| SessionEntry {
                state: Arc::new(Mutex::new(SessionState::seeded(self.max_history))),
                last_used: Instant::now(),
            });
        entry.last_used = Instant::now();
        entry.state.clone()
    }

    /// Forgets a session. Clearing an unknown id is a no-op.
    pub fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}
