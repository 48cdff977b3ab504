//! Read-receipt reconciliation rules.
//!
//! `readBy` is a monotone set: readers are only ever added, never removed,
//! and re-adding an existing reader is a no-op. `isRead` follows from the
//! set being non-empty. The store applies `merge_reader` under its write
//! lock and round-trips the set through the JSON column codec here.

use crate::ids::UserId;

/// Add `reader` to the reader set. Returns whether the set actually grew.
pub fn merge_reader(readers: &mut Vec<UserId>, reader: &UserId) -> bool {
    if readers.contains(reader) {
        return false;
    }
    readers.push(reader.clone());
    true
}

/// Decode the `read_by` column. An unreadable value is treated as empty
/// rather than poisoning the row.
pub fn decode_readers(raw: &str) -> Vec<UserId> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn encode_readers(readers: &[UserId]) -> Result<String, serde_json::Error> {
    serde_json::to_string(readers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_reader_adds_once() {
        let mut readers = Vec::new();
        let bob = UserId::from("bob");

        assert!(merge_reader(&mut readers, &bob));
        assert!(!merge_reader(&mut readers, &bob));
        assert_eq!(readers, vec![bob]);
    }

    #[test]
    fn merge_reader_never_shrinks_the_set() {
        let mut readers = vec![UserId::from("a")];
        for name in ["b", "a", "c", "b"] {
            merge_reader(&mut readers, &UserId::from(name));
        }
        assert_eq!(
            readers,
            vec![UserId::from("a"), UserId::from("b"), UserId::from("c")]
        );
    }

    #[test]
    fn readers_round_trip_through_the_column_codec() {
        let readers = vec![UserId::from("a"), UserId::from("b")];
        let encoded = encode_readers(&readers).unwrap();
        assert_eq!(decode_readers(&encoded), readers);
    }

    #[test]
    fn unreadable_column_decodes_as_empty() {
        assert!(decode_readers("not json").is_empty());
        assert!(decode_readers("").is_empty());
    }
}
