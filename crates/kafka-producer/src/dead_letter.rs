//! Dead-letter routing.

use kafka_types::Message;
use tracing::info;

use crate::error::Result;
use crate::producer::Producer;

/// A [`Producer`] bound to the dead-letter topic.
///
/// Shared by reference between all partition workers of a consumer group.
/// Routing is best-effort: a failed send is returned to the caller, which
/// logs it and moves on.
pub struct DeadLetterRouter {
    producer: Producer,
}

impl DeadLetterRouter {
    pub fn new(producer: Producer) -> Self {
        Self { producer }
    }

    /// Create a router sending to `topic` on the given brokers.
    pub fn connect(brokers: &[String], topic: &str) -> Result<Self> {
        let producer = Producer::connect(brokers, topic)?;
        info!("Dead-letter router bound to topic '{topic}'");
        Ok(Self::new(producer))
    }

    pub fn topic(&self) -> &str {
        self.producer.destination()
    }

    /// Forward the original key and value of `message`, unchanged.
    pub async fn route(&self, message: &Message) -> Result<()> {
        self.producer.send(&message.key, &message.value).await
    }

    pub async fn close(&self) -> Result<()> {
        self.producer.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.producer.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use crate::SendError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_route_preserves_original_key_and_value() {
        let sink = Arc::new(RecordingSink::new("orders-dlq"));
        let router = DeadLetterRouter::new(Producer::new(Arc::clone(&sink)));
        assert_eq!(router.topic(), "orders-dlq");

        let message = Message::new("orders", 3, 17, vec![0x00, 0xff], b"{\"id\":1}".to_vec());
        router.route(&message).await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, vec![0x00, 0xff]);
        assert_eq!(sent[0].value, b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_route_after_close_fails() {
        let sink = Arc::new(RecordingSink::new("orders-dlq"));
        let router = DeadLetterRouter::new(Producer::new(Arc::clone(&sink)));
        router.close().await.unwrap();

        let err = router
            .route(&Message::new("orders", 0, 0, "k", "v"))
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Closed));
        assert!(router.is_closed());
    }
}
