//! Wire protocol for the WebSocket layer.
//!
//! Events are JSON text frames with an `{"event": ..., "data": ...}`
//! envelope. Inbound (client-to-server) and outbound (server-to-client)
//! event sets are disjoint enums so each side only parses what it accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::types::Message;
use crate::ids::{GroupId, MessageId, UserId};

/// Events a client may send over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: GroupId,
    },
    LeaveRoom {
        room_id: GroupId,
    },
    Typing {
        #[serde(default)]
        receiver_id: Option<UserId>,
        #[serde(default)]
        group_id: Option<GroupId>,
    },
    StopTyping {
        #[serde(default)]
        receiver_id: Option<UserId>,
        #[serde(default)]
        group_id: Option<GroupId>,
    },
    MarkAsRead {
        message_ids: Vec<MessageId>,
        #[serde(default)]
        group_id: Option<GroupId>,
        #[serde(default)]
        sender_id: Option<UserId>,
    },
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full online snapshot, sent to every connection on any presence change.
    GetOnlineUsers { user_ids: Vec<UserId> },
    /// A direct message addressed to the receiving user.
    NewMessage(Message),
    /// A group message fanned out to room members.
    NewGroupMessage(Message),
    MessagesRead {
        message_ids: Vec<MessageId>,
        reader_id: UserId,
    },
    Typing {
        user_id: UserId,
        name: String,
    },
    StopTyping {
        user_id: UserId,
    },
    LastSeenUpdate {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
}

/// Destination of a typing indicator: a single peer or a room.
///
/// Clients are expected to set exactly one of `receiverId`/`groupId`;
/// anything else is malformed and yields `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingTarget {
    Direct(UserId),
    Room(GroupId),
}

impl TypingTarget {
    pub fn from_ids(receiver_id: Option<UserId>, group_id: Option<GroupId>) -> Option<Self> {
        match (receiver_id, group_id) {
            (Some(user), None) => Some(Self::Direct(user)),
            (None, Some(group)) => Some(Self::Room(group)),
            _ => None,
        }
    }
}
