use std::io::Write;
use std::time::Duration;

use kafka_relay::config::{parse_duration, ConsumeOverrides, RelayConfig};
use tokio_test::{assert_err, assert_ok};

const FULL_CONFIG: &str = r#"
kafka:
  brokers: [kafka-1:9092, kafka-2:9092]
  group_id: group1
  topics: [test-topic, audit]
  min_fetch_bytes: 1024
  max_fetch_bytes: 1048576
  commit_interval: 0
retry:
  count: 5
  delay: 250ms
dead_letter_topic: test-topic-dlq
logging:
  level: debug
  file: logs/relay.log
"#;

#[test]
fn test_full_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL_CONFIG.as_bytes()).unwrap();

    let config = RelayConfig::from_file(file.path()).unwrap();
    assert_eq!(config.kafka.brokers, vec!["kafka-1:9092", "kafka-2:9092"]);
    assert_eq!(config.kafka.group_id, "group1");
    assert_eq!(config.kafka.topics, vec!["test-topic", "audit"]);
    assert_eq!(config.kafka.commit_interval, Duration::ZERO);
    assert_eq!(config.retry.count, 5);
    assert_eq!(config.retry.delay, Duration::from_millis(250));
    assert_eq!(config.dead_letter_topic(), Some("test-topic-dlq"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file.as_deref(),
        Some(std::path::Path::new("logs/relay.log"))
    );

    let consumer = config.consumer_config();
    assert_eq!(consumer.bootstrap_servers(), "kafka-1:9092,kafka-2:9092");
    assert_eq!(consumer.min_fetch_bytes, 1024);
    assert_eq!(consumer.max_fetch_bytes, 1_048_576);
    assert_eq!(consumer.commit_interval, Duration::ZERO);
    assert_eq!(consumer.topics.len(), 2);
    assert_ok!(config.validate());
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = RelayConfig::from_yaml_str("kafka:\n  topics: [orders]\n").unwrap();
    assert_eq!(config.kafka.brokers, vec!["localhost:9092"]);
    assert_eq!(config.kafka.min_fetch_bytes, 10_000);
    assert_eq!(config.kafka.max_fetch_bytes, 10_000_000);
    assert_eq!(config.kafka.commit_interval, Duration::from_secs(1));
    assert_eq!(config.retry.count, 3);
    assert_eq!(config.retry.delay, Duration::from_secs(1));
    assert_eq!(config.dead_letter_topic(), None);
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());

    assert_eq!(RelayConfig::from_yaml_str("").unwrap(), RelayConfig::default());
}

#[test]
fn test_empty_dead_letter_topic_disables_routing() {
    let config = RelayConfig::from_yaml_str("dead_letter_topic: '  '\n").unwrap();
    assert_eq!(config.dead_letter_topic(), None);
}

#[test]
fn test_bare_number_durations_are_seconds() {
    let config = RelayConfig::from_yaml_str("retry:\n  delay: 2\n").unwrap();
    assert_eq!(config.retry.delay, Duration::from_secs(2));
}

#[test]
fn test_invalid_config_is_rejected() {
    assert_err!(RelayConfig::from_yaml_str("retry:\n  delay: soon\n"));
    assert_err!(RelayConfig::from_yaml_str("kafka:\n  brokerz: [a]\n"));
    assert_err!(RelayConfig::from_file(std::path::Path::new(
        "/nonexistent/kafka-relay.yaml"
    )));

    // Parses, but has no topic to consume
    let config = RelayConfig::from_yaml_str("kafka:\n  group_id: g\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(format!("{err:#}").contains("at least one topic"));
}

#[test]
fn test_overrides_replace_file_values() {
    let mut config = RelayConfig::from_yaml_str(FULL_CONFIG).unwrap();
    config.apply_overrides(&ConsumeOverrides {
        brokers: Some(vec!["override:9092".to_string()]),
        group_id: None,
        topics: Some(vec!["orders".to_string()]),
        retry_count: Some(0),
        retry_delay: Some(parse_duration("5s").unwrap()),
        dlq_topic: Some(String::new()),
    });

    assert_eq!(config.kafka.brokers, vec!["override:9092"]);
    assert_eq!(config.kafka.group_id, "group1");
    assert_eq!(config.kafka.topics, vec!["orders"]);
    assert_eq!(config.retry.count, 0);
    assert_eq!(config.retry.delay, Duration::from_secs(5));
    assert_eq!(config.dead_letter_topic(), None);
}

#[test]
fn test_no_overrides_keep_file_values() {
    let mut config = RelayConfig::from_yaml_str(FULL_CONFIG).unwrap();
    let before = config.clone();
    config.apply_overrides(&ConsumeOverrides::default());
    assert_eq!(config, before);
}
