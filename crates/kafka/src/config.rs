use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for a consumer group.
///
/// Constructed once at startup and owned by the [`crate::ConsumerGroup`];
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka broker addresses (`host:port`)
    pub brokers: Vec<String>,
    /// Consumer group ID
    ///
    /// Shared by every reader of the group, so the broker spreads partitions
    /// across all processes running with the same ID.
    pub group_id: String,
    /// Topics to consume from
    ///
    /// One reader and one partition worker is started per topic.
    pub topics: BTreeSet<String>,
    /// Minimum number of bytes the broker should accumulate before answering a fetch
    pub min_fetch_bytes: u32,
    /// Maximum number of bytes returned by a single fetch
    pub max_fetch_bytes: u32,
    /// Commit interval hint
    ///
    /// Zero means every per-message commit is sent to the broker synchronously.
    /// A non-zero interval stores the offset locally and lets the client's
    /// auto-commit flush stored offsets at this interval. Either way the
    /// per-message commit issued by the worker decides which offset is stored.
    pub commit_interval: Duration,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// "earliest" means the consumer will start from the beginning of the topic
    /// if no committed offsets are found for the consumer group.
    /// "latest" means the consumer will start from the end of the topic.
    pub auto_offset_reset: String,
    /// Session timeout
    pub session_timeout: Duration,
    /// Upper bound for the metadata probe run when a reader is created
    pub metadata_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            group_id: "kafka-relay".to_string(),
            topics: BTreeSet::new(),
            min_fetch_bytes: 10_000,
            max_fetch_bytes: 10_000_000,
            commit_interval: Duration::from_secs(1),
            auto_offset_reset: "earliest".to_string(),
            session_timeout: Duration::from_secs(6),
            metadata_timeout: Duration::from_secs(10),
        }
    }
}

impl ConsumerConfig {
    pub fn new<I, T>(brokers: Vec<String>, group_id: &str, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            brokers,
            group_id: group_id.to_string(),
            topics: topics.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Brokers in the comma-separated form librdkafka expects.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    pub fn validate(&self) -> Result<()> {
        if self.brokers.iter().all(|b| b.trim().is_empty()) {
            return Err(Error::InvalidConfig("at least one broker is required".into()));
        }
        if self.group_id.trim().is_empty() {
            return Err(Error::InvalidConfig("group id must not be empty".into()));
        }
        if self.topics.is_empty() {
            return Err(Error::InvalidConfig("at least one topic is required".into()));
        }
        if let Some(topic) = self.topics.iter().find(|t| t.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!("invalid topic name '{topic}'")));
        }
        if self.min_fetch_bytes > self.max_fetch_bytes {
            return Err(Error::InvalidConfig(format!(
                "min_fetch_bytes ({}) exceeds max_fetch_bytes ({})",
                self.min_fetch_bytes, self.max_fetch_bytes
            )));
        }
        match self.auto_offset_reset.as_str() {
            "earliest" | "latest" => {}
            other => {
                return Err(Error::InvalidConfig(format!(
                    "auto_offset_reset must be 'earliest' or 'latest', got '{other}'"
                )))
            }
        }
        Ok(())
    }
}
