//! Branded id newtypes.
//!
//! Users, groups, messages, and live connections all carry string ids on the
//! wire. Wrapping each in its own newtype keeps a group id from ever being
//! handed to something expecting a user id, and gives every id one canonical
//! comparable representation instead of ad-hoc string/ObjectId coercion.
//! Server-minted ids are UUID v7 (time-ordered).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh random id (UUID v7).
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id! {
    /// Stable identity of an authenticated user (resolved externally, carried
    /// in JWT claims).
    UserId
}

string_id! {
    /// Identifier of a group chat; doubles as the room id for live fan-out.
    GroupId
}

string_id! {
    /// Identifier of a persisted message.
    MessageId
}

string_id! {
    /// Identity of one live WebSocket connection. A reconnecting user gets a
    /// new one; registry eviction compares these, never user ids.
    ConnectionId
}
