//! Shared helpers for the integration tests: spin up a real server on an
//! ephemeral port and drive it over HTTP and WebSocket.

// Each test binary compiles this module separately and uses a different
// subset of it.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// How long to wait for an event that should arrive.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to listen before concluding an event will not arrive.
pub const QUIET_WINDOW: Duration = Duration::from_millis(400);

pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
    pub jwt_secret: Vec<u8>,
    // Dropping this removes the data dir, so it lives as long as the server.
    _data_dir: tempfile::TempDir,
}

/// Start a server instance backed by a temp data dir, listening on a
/// random local port.
pub async fn start_test_server() -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = natter_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = natter_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to load JWT secret");

    let state = natter_server::state::AppState {
        store: natter_server::chat::store::MessageStore::new(db),
        jwt_secret: jwt_secret.clone(),
        registry: Arc::new(natter_server::ws::registry::ConnectionRegistry::new()),
        rooms: Arc::new(natter_server::chat::rooms::RoomTracker::new()),
        last_seen: Arc::new(DashMap::new()),
    };

    let app = natter_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        base_url: format!("http://{addr}"),
        jwt_secret,
        _data_dir: tmp_dir,
    }
}

impl TestServer {
    /// Mint an access token for a test user.
    pub fn token_for(&self, user_id: &str, name: &str) -> String {
        natter_server::auth::jwt::issue_access_token(&self.jwt_secret, user_id, name)
            .expect("Failed to issue token")
    }

    /// Open an authenticated WebSocket connection as the given user.
    pub async fn connect_ws(&self, user_id: &str, name: &str) -> (WsWriter, WsReader) {
        let token = self.token_for(user_id, name);
        let ws_url = format!("ws://{}/ws?token={token}", self.addr);
        let (stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .expect("Failed to connect WebSocket");
        stream.split()
    }
}

/// Send a client event frame as JSON text.
pub async fn send_event(write: &mut WsWriter, event: serde_json::Value) {
    write
        .send(Message::Text(event.to_string().into()))
        .await
        .expect("Failed to send event");
}

/// Read frames until one carries the wanted event name, skipping any
/// others. Panics if it does not show up within [`EVENT_TIMEOUT`].
pub async fn next_event(read: &mut WsReader, event: &str) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let msg = tokio::time::timeout(remaining, read.next())
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for {event} event"))
            .expect("Stream ended before event arrived")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["event"] == event {
                return value;
            }
        }
    }
}

/// Collect every event frame that arrives within the window. Used to
/// assert that something did NOT reach a client.
pub async fn events_within(read: &mut WsReader, window: Duration) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                events.push(serde_json::from_str(&text).unwrap());
            }
            Ok(Some(Ok(_))) => continue,
            _ => break,
        }
    }
    events
}

/// POST a direct message over the REST API, asserting it is accepted.
pub async fn post_direct_message(
    server: &TestServer,
    token: &str,
    receiver_id: &str,
    text: &str,
) -> serde_json::Value {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/messages/{receiver_id}", server.base_url))
        .bearer_auth(token)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .expect("Failed to POST message");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("Invalid message body")
}

/// POST a group message over the REST API, asserting it is accepted.
pub async fn post_group_message(
    server: &TestServer,
    token: &str,
    group_id: &str,
    text: &str,
) -> serde_json::Value {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/groups/{group_id}/messages", server.base_url))
        .bearer_auth(token)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .expect("Failed to POST group message");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("Invalid message body")
}
