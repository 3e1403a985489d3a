//! Kafka message types.
//!
//! Owned representation of a fetched Kafka record. The broker client hands out
//! borrowed messages tied to the consumer's lifetime; the pipeline converts them
//! into this type once, right after fetch, and never mutates them afterwards.

use std::borrow::Cow;

/// A fetched Kafka message with its origin.
///
/// `key` and `value` are opaque byte sequences. A record without a key (or
/// without a payload) is represented with an empty vector rather than `None`,
/// so the handler and the dead-letter router always see the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Message key (empty when the record had none)
    pub key: Vec<u8>,
    /// Message payload (empty when the record had none)
    pub value: Vec<u8>,
    /// Message timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: key.into(),
            value: value.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Key rendered for log output. Invalid UTF-8 is replaced, never rejected.
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_has_no_timestamp() {
        let msg = Message::new("orders", 2, 41, "k1", "v1");
        assert_eq!(msg.topic, "orders");
        assert_eq!(msg.partition, 2);
        assert_eq!(msg.offset, 41);
        assert_eq!(msg.key, b"k1");
        assert_eq!(msg.value, b"v1");
        assert_eq!(msg.timestamp, None);

        let msg = msg.with_timestamp(1_700_000_000_000);
        assert_eq!(msg.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_key_lossy_handles_empty_and_invalid_utf8() {
        let empty = Message::new("t", 0, 0, Vec::new(), "v");
        assert_eq!(empty.key_lossy(), "");

        let invalid = Message::new("t", 0, 0, vec![0x66, 0xff, 0x6f], "v");
        assert_eq!(invalid.key_lossy(), "f\u{fffd}o");
    }
}
