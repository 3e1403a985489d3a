use crate::config::ConsumerConfig;
use crate::error::{Error, Result};
use crate::reader::{PartitionReader, ReaderFactory};
use async_trait::async_trait;
use kafka_types::Message;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{
    CommitMode, Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer,
};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Kafka reader bound to one topic of a consumer group.
///
/// Wraps an rdkafka `StreamConsumer` subscribed to a single topic. The broker
/// assigns this reader a subset of the topic's partitions; messages of one
/// partition arrive in offset order.
pub struct KafkaReader {
    consumer: Arc<RdkafkaStreamConsumer>,
    topic: String,
    sync_commit: bool,
    closed: bool,
}

impl KafkaReader {
    /// Create a reader and subscribe it to `topic`.
    ///
    /// This does not talk to the brokers yet; see [`KafkaReader::probe`].
    pub fn new(config: &ConsumerConfig, topic: &str) -> Result<Self> {
        let sync_commit = config.commit_interval.is_zero();
        let receive_max_bytes = u64::from(config.max_fetch_bytes) + 512;

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set(
                "session.timeout.ms",
                config.session_timeout.as_millis().to_string(),
            )
            .set("fetch.min.bytes", config.min_fetch_bytes.to_string())
            .set("fetch.max.bytes", config.max_fetch_bytes.to_string())
            .set("receive.message.max.bytes", receive_max_bytes.to_string())
            .set("enable.partition.eof", "false")
            // Offsets are only stored for messages the worker has finished with
            .set("enable.auto.offset.store", "false");

        if sync_commit {
            client_config.set("enable.auto.commit", "false");
        } else {
            client_config
                .set("enable.auto.commit", "true")
                .set(
                    "auto.commit.interval.ms",
                    config.commit_interval.as_millis().to_string(),
                );
        }

        let consumer: RdkafkaStreamConsumer = client_config
            .create()
            .map_err(|e| Error::Consumer(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| Error::Consumer(format!("Failed to subscribe to topic: {e}")))?;

        Ok(Self {
            consumer: Arc::new(consumer),
            topic: topic.to_string(),
            sync_commit,
            closed: false,
        })
    }

    /// Fetch metadata for the reader's topic to make sure the brokers are reachable.
    pub async fn probe(&self, timeout: Duration) -> Result<()> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        // fetch_metadata blocks the calling thread
        let topic_error = tokio::task::spawn_blocking(move || {
            let metadata = consumer.fetch_metadata(Some(topic.as_str()), timeout)?;
            let error = metadata
                .topics()
                .iter()
                .find(|t| t.name() == topic)
                .and_then(|t| t.error())
                .map(|e| format!("{e:?}"));
            Ok::<_, rdkafka::error::KafkaError>(error)
        })
        .await??;

        match topic_error {
            // The topic may still be auto-created on first use
            Some(error) => warn!(topic = %self.topic, "Topic metadata reports {error}"),
            None => debug!(topic = %self.topic, "Brokers reachable"),
        }
        Ok(())
    }

    fn to_message(msg: &RdkafkaBorrowedMessage<'_>) -> Message {
        Message {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(<[u8]>::to_vec).unwrap_or_default(),
            value: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            timestamp: msg.timestamp().to_millis(),
        }
    }
}

#[async_trait]
impl PartitionReader for KafkaReader {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn fetch(&mut self) -> Result<Message> {
        let msg = self.consumer.recv().await?;
        Ok(Self::to_message(&msg))
    }

    async fn commit(&mut self, message: &Message) -> Result<()> {
        // The committed offset is the next one to read
        let next_offset = message.offset + 1;

        if !self.sync_commit {
            self.consumer
                .store_offset(&message.topic, message.partition, next_offset)?;
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&message.topic, message.partition, Offset::Offset(next_offset))
            .map_err(|e| Error::Consumer(format!("Failed to add partition offset: {e}")))?;

        let consumer = Arc::clone(&self.consumer);
        tokio::task::spawn_blocking(move || consumer.commit(&tpl, CommitMode::Sync))
            .await?
            .map_err(|e| Error::Consumer(format!("Failed to commit offset: {e}")))?;

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Reader closed");
        Ok(())
    }
}

/// Creates one [`KafkaReader`] per topic and checks broker connectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaReaderFactory;

#[async_trait]
impl ReaderFactory for KafkaReaderFactory {
    async fn create_reader(
        &self,
        config: &ConsumerConfig,
        topic: &str,
    ) -> Result<Box<dyn PartitionReader>> {
        let reader = KafkaReader::new(config, topic)?;
        reader.probe(config.metadata_timeout).await?;
        Ok(Box::new(reader))
    }
}
