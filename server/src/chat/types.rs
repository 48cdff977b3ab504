//! Message data types shared between the store, the router, and the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, MessageId, UserId};

/// A persisted chat message, as stored and as serialized to clients.
///
/// Exactly one of `receiver_id` (direct message) and `group_id` (group
/// message) is set; the store enforces this on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Users who have read this message. Set semantics: no duplicates,
    /// grows monotonically.
    #[serde(default)]
    pub read_by: Vec<UserId>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a message. The store assigns the id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub group_id: Option<GroupId>,
    pub text: Option<String>,
    pub image: Option<String>,
}

impl NewMessage {
    pub fn direct(sender_id: UserId, receiver_id: UserId) -> Self {
        Self {
            sender_id,
            receiver_id: Some(receiver_id),
            group_id: None,
            text: None,
            image: None,
        }
    }

    pub fn group(sender_id: UserId, group_id: GroupId) -> Self {
        Self {
            sender_id,
            receiver_id: None,
            group_id: Some(group_id),
            text: None,
            image: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_camel_case_and_omits_empty_optionals() {
        let msg = Message {
            id: MessageId::from("m1"),
            sender_id: UserId::from("alice"),
            receiver_id: Some(UserId::from("bob")),
            group_id: None,
            text: Some("hi".to_string()),
            image: None,
            read_by: vec![],
            is_read: false,
            created_at: "2025-01-15T10:00:00Z".parse().unwrap(),
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderId"], "alice");
        assert_eq!(json["receiverId"], "bob");
        assert_eq!(json["createdAt"], "2025-01-15T10:00:00Z");
        assert!(json.get("groupId").is_none());
        assert!(json.get("image").is_none());
    }

    #[test]
    fn new_message_builders_set_exactly_one_destination() {
        let dm = NewMessage::direct(UserId::from("a"), UserId::from("b")).with_text("x");
        assert!(dm.receiver_id.is_some() && dm.group_id.is_none());

        let gm = NewMessage::group(UserId::from("a"), GroupId::from("g")).with_text("x");
        assert!(gm.receiver_id.is_none() && gm.group_id.is_some());
    }
}
