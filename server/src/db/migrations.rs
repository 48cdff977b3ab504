use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: messages

CREATE TABLE messages (
    id TEXT PRIMARY KEY,
    sender_id TEXT NOT NULL,
    receiver_id TEXT,
    group_id TEXT,
    text TEXT,
    image TEXT,
    read_by TEXT NOT NULL DEFAULT '[]',
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    -- a message is direct or group, never both, never neither
    CHECK ((receiver_id IS NULL) <> (group_id IS NULL))
);

CREATE INDEX idx_messages_direct ON messages(sender_id, receiver_id);
CREATE INDEX idx_messages_group ON messages(group_id);
",
    )])
}
