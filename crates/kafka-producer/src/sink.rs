//! Send transports.
//!
//! [`MessageSink`] is the narrow seam between [`crate::Producer`] and the broker.
//! [`KafkaSink`] is the production implementation on top of an rdkafka
//! `FutureProducer`, which is internally synchronized and safe to share
//! between concurrently sending tasks.

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as _};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SendError};

/// A destination that accepts single key/value records.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one record. `timeout` bounds how long the transport may queue it.
    async fn send(&self, key: &[u8], value: &[u8], timestamp_ms: i64, timeout: Duration)
        -> Result<()>;

    /// Wait for queued records to be delivered, then release transport resources.
    async fn flush(&self, timeout: Duration) -> Result<()>;

    /// Destination topic, used for logging.
    fn destination(&self) -> &str;
}

#[async_trait]
impl<T: MessageSink + ?Sized> MessageSink for Arc<T> {
    async fn send(
        &self,
        key: &[u8],
        value: &[u8],
        timestamp_ms: i64,
        timeout: Duration,
    ) -> Result<()> {
        (**self).send(key, value, timestamp_ms, timeout).await
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        (**self).flush(timeout).await
    }

    fn destination(&self) -> &str {
        (**self).destination()
    }
}

/// rdkafka-backed sink bound to a single topic.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    /// Create a sink for `topic`.
    ///
    /// Creating the producer does not contact the brokers; connection problems
    /// surface on the first send.
    pub fn new(brokers: &[String], topic: &str, send_timeout: Duration) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .set("acks", "all")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl MessageSink for KafkaSink {
    async fn send(
        &self,
        key: &[u8],
        value: &[u8],
        timestamp_ms: i64,
        timeout: Duration,
    ) -> Result<()> {
        let record = FutureRecord::to(&self.topic)
            .key(key)
            .payload(value)
            .timestamp(timestamp_ms);

        self.producer
            .send(record, timeout)
            .await
            .map(|_| ())
            .map_err(|(err, _)| SendError::Kafka(err))
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        // librdkafka's flush blocks the calling thread
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| SendError::Transport(format!("flush task failed: {e}")))??;
        Ok(())
    }

    fn destination(&self) -> &str {
        &self.topic
    }
}
