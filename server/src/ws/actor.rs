use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::auth::middleware::Claims;
use crate::chat::events::ClientEvent;
use crate::chat::presence;
use crate::chat::router::{self, EventOrigin};
use crate::ids::ConnectionId;
use crate::state::AppState;
use crate::ws::registry::ConnectionHandle;

/// Ping interval: server sends WebSocket ping every 30 seconds.
/// Prevents connection leaks from abrupt disconnects.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader loop: parses incoming events and dispatches them one at a time,
///   so a sender's typing/message/read sequences are delivered in order
///
/// The mpsc channel allows any part of the system to push frames to this
/// client by cloning the sender.
pub async fn run_connection(socket: WebSocket, state: AppState, claims: Claims) {
    let user_id = claims.user_id();
    let conn_id = ConnectionId::new();

    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Register this connection, displacing any previous one for the user,
    // then announce the new online set to everyone (this client included).
    let replaced = state.registry.register(
        &user_id,
        ConnectionHandle {
            conn_id: conn_id.clone(),
            sender: tx.clone(),
        },
    );
    if replaced {
        tracing::debug!(user_id = %user_id, "Connection replaced a previous one");
    }
    presence::announce(&state);

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket actor started");

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    let origin = EventOrigin {
        user_id: user_id.clone(),
        name: claims.name.clone(),
        conn_id: conn_id.clone(),
        sender: tx.clone(),
    };

    // Reader loop: process incoming WebSocket messages
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => {
                        router::dispatch(&state, &origin, event).await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            user_id = %user_id,
                            error = %e,
                            "Dropping malformed client event"
                        );
                    }
                },
                Message::Binary(_) => {
                    tracing::debug!(
                        user_id = %user_id,
                        "Received binary frame (expected JSON text), ignoring"
                    );
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(user_id = %user_id, reason = ?frame, "Client initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "WebSocket receive error");
                break;
            }
            None => {
                tracing::info!(user_id = %user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    // Drop room memberships and the registry entry before any further event
    // can reference this connection. The registry removal is guarded: if a
    // newer connection for this user already took over, nothing is removed
    // and nothing is announced.
    state.rooms.drop_all(&conn_id);
    let removed = state.registry.unregister(&user_id, &conn_id);

    if removed {
        presence::announce(&state);
        presence::record_last_seen(&state, &user_id);
    } else {
        tracing::debug!(
            user_id = %user_id,
            conn_id = %conn_id,
            "Stale disconnect; registry entry already superseded"
        );
    }

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket actor stopped");
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
