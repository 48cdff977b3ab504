use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::chat::rooms::RoomTracker;
use crate::chat::store::MessageStore;
use crate::ids::UserId;
use crate::ws::registry::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Message persistence
    pub store: MessageStore,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// The single live WebSocket connection per user
    pub registry: Arc<ConnectionRegistry>,
    /// Room membership for group fan-out
    pub rooms: Arc<RoomTracker>,
    /// Last disconnect time per user
    pub last_seen: Arc<DashMap<UserId, DateTime<Utc>>>,
}
