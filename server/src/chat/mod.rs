//! Real-time chat core.
//!
//! Owns the moving parts of message delivery: the persisted message store,
//! room membership for group fan-out, the event router that turns inbound
//! client events into unicast/multicast deliveries, read-receipt
//! reconciliation, and presence tracking (online set + last-seen).
//!
//! REST handlers for sending and fetching messages live in `messages`; they
//! persist through `store` and then hand the created message to `router` for
//! live delivery.

pub mod events;
pub mod messages;
pub mod presence;
pub mod receipts;
pub mod rooms;
pub mod router;
pub mod store;
pub mod types;
