//! Presence tracking and broadcast.
//!
//! The online set derives entirely from the connection registry: after every
//! register and every actual unregister, the full snapshot goes to every
//! live connection. There is no per-user delta event; clients replace their
//! online list wholesale. Last-seen times are recorded at disconnect,
//! broadcast as `lastSeenUpdate`, and served over REST.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::auth::middleware::Claims;
use crate::chat::events::ServerEvent;
use crate::ids::UserId;
use crate::state::AppState;
use crate::ws::broadcast::broadcast_to_all;

/// Broadcast the full online snapshot to every live connection.
pub fn announce(state: &AppState) {
    let user_ids = state.registry.snapshot();
    broadcast_to_all(&state.registry, &ServerEvent::GetOnlineUsers { user_ids });
}

/// Record the user's disconnect time and tell everyone.
pub fn record_last_seen(state: &AppState, user_id: &UserId) {
    let timestamp = Utc::now();
    state.last_seen.insert(user_id.clone(), timestamp);
    broadcast_to_all(
        &state.registry,
        &ServerEvent::LastSeenUpdate {
            user_id: user_id.clone(),
            timestamp,
        },
    );
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub online: Vec<UserId>,
    pub last_seen: HashMap<UserId, DateTime<Utc>>,
}

/// GET /api/presence — online users plus last-seen times. JWT auth required.
pub async fn get_presence(
    State(state): State<AppState>,
    _claims: Claims,
) -> Json<PresenceResponse> {
    let mut online = state.registry.snapshot();
    online.sort();

    let last_seen = state
        .last_seen
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();

    Json(PresenceResponse { online, last_seen })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::rooms::RoomTracker;
    use crate::chat::store::MessageStore;
    use crate::db::init_db_in_memory;
    use crate::ids::ConnectionId;
    use crate::ws::registry::{ConnectionHandle, ConnectionRegistry};
    use dashmap::DashMap;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn test_state() -> AppState {
        AppState {
            store: MessageStore::new(init_db_in_memory().unwrap()),
            jwt_secret: vec![0u8; 32],
            registry: Arc::new(ConnectionRegistry::new()),
            rooms: Arc::new(RoomTracker::new()),
            last_seen: Arc::new(DashMap::new()),
        }
    }

    fn connect(
        state: &AppState,
        user: &str,
        conn: &str,
    ) -> mpsc::UnboundedReceiver<axum::extract::ws::Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.registry.register(
            &UserId::from(user),
            ConnectionHandle {
                conn_id: ConnectionId::from(conn),
                sender: tx,
            },
        );
        rx
    }

    fn next_json(
        rx: &mut mpsc::UnboundedReceiver<axum::extract::ws::Message>,
    ) -> serde_json::Value {
        match rx.try_recv().expect("expected a frame") {
            axum::extract::ws::Message::Text(text) => {
                serde_json::from_str(text.as_str()).unwrap()
            }
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn announce_sends_full_snapshot_to_everyone() {
        let state = test_state();
        let mut rx_a = connect(&state, "a", "c1");
        let mut rx_b = connect(&state, "b", "c2");

        announce(&state);

        for rx in [&mut rx_a, &mut rx_b] {
            let value = next_json(rx);
            assert_eq!(value["event"], "getOnlineUsers");
            let mut ids: Vec<String> = value["data"]["userIds"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect();
            ids.sort();
            assert_eq!(ids, vec!["a", "b"]);
        }
    }

    #[tokio::test]
    async fn record_last_seen_stores_and_broadcasts() {
        let state = test_state();
        let mut rx_a = connect(&state, "a", "c1");

        record_last_seen(&state, &UserId::from("b"));

        assert!(state.last_seen.contains_key(&UserId::from("b")));
        let value = next_json(&mut rx_a);
        assert_eq!(value["event"], "lastSeenUpdate");
        assert_eq!(value["data"]["userId"], "b");
        let timestamp = value["data"]["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
}
