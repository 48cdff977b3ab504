//! Persistence interface for chat messages.
//!
//! rusqlite is synchronous, so every call clones the shared connection handle
//! and does the row work inside `spawn_blocking`. The mutex serializes
//! writers; per-message read-modify-write in `mark_read` is therefore atomic.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::chat::receipts;
use crate::chat::types::{Message, NewMessage};
use crate::db::DbPool;
use crate::error::ServerError;
use crate::ids::{GroupId, MessageId, UserId};

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, group_id, text, image, read_by, is_read, created_at";

/// Message store backed by the `messages` table.
#[derive(Clone)]
pub struct MessageStore {
    db: DbPool,
}

impl MessageStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Persist a new message, assigning its id and timestamp.
    ///
    /// Exactly one of `receiver_id`/`group_id` must be set.
    pub async fn create(&self, new: NewMessage) -> Result<Message, ServerError> {
        if new.receiver_id.is_some() == new.group_id.is_some() {
            return Err(ServerError::BadRequest(
                "message requires exactly one of receiverId or groupId".to_string(),
            ));
        }

        let message = Message {
            id: MessageId::new(),
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            group_id: new.group_id,
            text: new.text,
            image: new.image,
            read_by: Vec::new(),
            is_read: false,
            created_at: Utc::now(),
        };

        let db = self.db.clone();
        let row = message.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ServerError::persistence("database lock poisoned"))?;
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, group_id, text, image, read_by, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, '[]', 0, ?7)",
                params![
                    row.id.as_str(),
                    row.sender_id.as_str(),
                    row.receiver_id.as_ref().map(|id| id.as_str()),
                    row.group_id.as_ref().map(|id| id.as_str()),
                    row.text,
                    row.image,
                    row.created_at.to_rfc3339(),
                ],
            )?;
            Ok::<_, ServerError>(())
        })
        .await??;

        Ok(message)
    }

    pub async fn find(&self, id: &MessageId) -> Result<Option<Message>, ServerError> {
        let db = self.db.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ServerError::persistence("database lock poisoned"))?;
            let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
            conn.query_row(&sql, params![id.as_str()], row_to_message)
                .optional()
                .map_err(ServerError::from)
        })
        .await?
    }

    /// Add `reader` to `read_by` for each listed message (set semantics) and
    /// mark it read. Unknown ids are skipped. Returns whether any row changed.
    pub async fn mark_read(
        &self,
        ids: &[MessageId],
        reader: &UserId,
    ) -> Result<bool, ServerError> {
        let db = self.db.clone();
        let ids: Vec<MessageId> = ids.to_vec();
        let reader = reader.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ServerError::persistence("database lock poisoned"))?;

            let mut changed = false;
            for id in &ids {
                let raw: Option<String> = conn
                    .query_row(
                        "SELECT read_by FROM messages WHERE id = ?1",
                        params![id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(raw) = raw else {
                    continue;
                };

                let mut readers = receipts::decode_readers(&raw);
                if !receipts::merge_reader(&mut readers, &reader) {
                    continue;
                }
                let encoded =
                    receipts::encode_readers(&readers).map_err(ServerError::persistence)?;
                conn.execute(
                    "UPDATE messages SET read_by = ?2, is_read = 1 WHERE id = ?1",
                    params![id.as_str(), encoded],
                )?;
                changed = true;
            }
            Ok(changed)
        })
        .await?
    }

    /// All direct messages between two users, in both directions, oldest first.
    pub async fn direct_history(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<Vec<Message>, ServerError> {
        let db = self.db.clone();
        let a = user_a.clone();
        let b = user_b.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ServerError::persistence("database lock poisoned"))?;
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE group_id IS NULL
                   AND ((sender_id = ?1 AND receiver_id = ?2)
                     OR (sender_id = ?2 AND receiver_id = ?1))
                 ORDER BY created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![a.as_str(), b.as_str()], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// All messages in a group, oldest first.
    pub async fn group_history(&self, group_id: &GroupId) -> Result<Vec<Message>, ServerError> {
        let db = self.db.clone();
        let group_id = group_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ServerError::persistence("database lock poisoned"))?;
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE group_id = ?1 ORDER BY created_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![group_id.as_str()], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let read_by: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(Message {
        id: MessageId::from(row.get::<_, String>(0)?),
        sender_id: UserId::from(row.get::<_, String>(1)?),
        receiver_id: row.get::<_, Option<String>>(2)?.map(UserId::from),
        group_id: row.get::<_, Option<String>>(3)?.map(GroupId::from),
        text: row.get(4)?,
        image: row.get(5)?,
        read_by: receipts::decode_readers(&read_by),
        is_read: row.get(7)?,
        created_at,
    })
}
