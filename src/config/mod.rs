//! Host configuration: YAML file plus command-line overrides.

pub mod duration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use kafka_relay_consumer::ConsumerConfig;
use serde::Deserialize;

pub use duration::parse_duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub kafka: KafkaSection,
    pub retry: RetrySection,
    /// Topic for messages that exhaust their retries. Absent or empty disables
    /// dead-lettering.
    pub dead_letter_topic: Option<String>,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KafkaSection {
    pub brokers: Vec<String>,
    pub group_id: String,
    pub topics: Vec<String>,
    pub min_fetch_bytes: u32,
    pub max_fetch_bytes: u32,
    /// Zero commits synchronously after every message
    #[serde(deserialize_with = "duration::deserialize")]
    pub commit_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Retries after the first attempt
    pub count: u32,
    #[serde(deserialize_with = "duration::deserialize")]
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Also append logs to this file
    pub file: Option<PathBuf>,
}

impl Default for KafkaSection {
    fn default() -> Self {
        let consumer = ConsumerConfig::default();
        Self {
            brokers: consumer.brokers,
            group_id: consumer.group_id,
            topics: Vec::new(),
            min_fetch_bytes: consumer.min_fetch_bytes,
            max_fetch_bytes: consumer.max_fetch_bytes,
            commit_interval: consumer.commit_interval,
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            count: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Command-line overrides for values in the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConsumeOverrides {
    /// Kafka brokers (comma-separated)
    #[arg(long, env = "KAFKA_BROKERS", value_delimiter = ',')]
    pub brokers: Option<Vec<String>>,

    /// Consumer group id
    #[arg(long, env = "KAFKA_GROUP_ID")]
    pub group_id: Option<String>,

    /// Topics to consume (comma-separated)
    #[arg(long, env = "KAFKA_TOPICS", value_delimiter = ',')]
    pub topics: Option<Vec<String>>,

    /// Retries after the first failed attempt
    #[arg(long)]
    pub retry_count: Option<u32>,

    /// Delay between attempts (e.g. "500ms", "2s")
    #[arg(long, value_parser = parse_duration)]
    pub retry_delay: Option<Duration>,

    /// Dead-letter topic; an empty value disables dead-lettering
    #[arg(long, env = "KAFKA_DLQ_TOPIC")]
    pub dlq_topic: Option<String>,
}

impl RelayConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Invalid YAML configuration")
    }

    pub fn apply_overrides(&mut self, overrides: &ConsumeOverrides) {
        if let Some(brokers) = &overrides.brokers {
            self.kafka.brokers = brokers.clone();
        }
        if let Some(group_id) = &overrides.group_id {
            self.kafka.group_id = group_id.clone();
        }
        if let Some(topics) = &overrides.topics {
            self.kafka.topics = topics.clone();
        }
        if let Some(count) = overrides.retry_count {
            self.retry.count = count;
        }
        if let Some(delay) = overrides.retry_delay {
            self.retry.delay = delay;
        }
        if let Some(topic) = &overrides.dlq_topic {
            self.dead_letter_topic = Some(topic.clone());
        }
    }

    /// Dead-letter topic, if dead-lettering is enabled.
    pub fn dead_letter_topic(&self) -> Option<&str> {
        self.dead_letter_topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        let mut config = ConsumerConfig::new(
            self.kafka.brokers.clone(),
            &self.kafka.group_id,
            self.kafka.topics.iter().cloned(),
        );
        config.min_fetch_bytes = self.kafka.min_fetch_bytes;
        config.max_fetch_bytes = self.kafka.max_fetch_bytes;
        config.commit_interval = self.kafka.commit_interval;
        config
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.consumer_config()
            .validate()
            .context("Invalid kafka configuration")?;
        Ok(())
    }
}
