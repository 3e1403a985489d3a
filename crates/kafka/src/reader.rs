//! Broker transport seams used by the partition workers.

use std::sync::Arc;

use async_trait::async_trait;
use kafka_types::Message;

use crate::config::ConsumerConfig;
use crate::error::Result;

/// One ordered stream of messages, owned by exactly one partition worker.
/// Implementations need no internal locking.
#[async_trait]
pub trait PartitionReader: Send + Sync {
    /// Topic this reader is bound to.
    fn topic(&self) -> &str;

    /// Wait for the next message.
    ///
    /// Must be cancel-safe: the worker drops the returned future when the
    /// group stops, and no message may be lost by doing so.
    async fn fetch(&mut self) -> Result<Message>;

    /// Record that `message` has reached a terminal outcome.
    async fn commit(&mut self, message: &Message) -> Result<()>;

    /// Release the underlying transport.
    async fn close(&mut self) -> Result<()>;
}

/// Creates the reader for one subscribed topic.
#[async_trait]
pub trait ReaderFactory: Send + Sync {
    async fn create_reader(
        &self,
        config: &ConsumerConfig,
        topic: &str,
    ) -> Result<Box<dyn PartitionReader>>;
}

#[async_trait]
impl<T: ReaderFactory + ?Sized> ReaderFactory for Arc<T> {
    async fn create_reader(
        &self,
        config: &ConsumerConfig,
        topic: &str,
    ) -> Result<Box<dyn PartitionReader>> {
        (**self).create_reader(config, topic).await
    }
}
