use std::sync::Arc;

use chat_pipeline::{EscalationController, SessionStore};
use common::storage::db::SurrealDbClient;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub sessions: Arc<SessionStore>,
    pub chat: Arc<EscalationController>,
}

impl ApiState {
    pub fn new(
        db: Arc<SurrealDbClient>,
        sessions: Arc<SessionStore>,
        chat: Arc<EscalationController>,
    ) -> Self {
        Self { db, sessions, chat }
    }
}
