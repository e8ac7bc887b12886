use crate::chat::protocol::ChatService;
use crate::db::DbPool;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
/// Built once at startup; tests build a fresh one per server.
#[derive(Clone)]
pub struct AppState {
    /// Store for users, activities, participants, messages, follows, notifications
    pub db: DbPool,
    /// Live WebSocket channel per connected user
    pub connections: ConnectionRegistry,
    /// Activity chat protocol, sharing `db`
    pub chat: ChatService,
}

impl AppState {
    pub fn new(db: DbPool, max_content_length: usize) -> Self {
        Self {
            chat: ChatService::new(db.clone(), max_content_length),
            connections: ConnectionRegistry::new(),
            db,
        }
    }
}
