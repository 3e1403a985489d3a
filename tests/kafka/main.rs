//! Kafka end-to-end tests
//!
//! These tests need a running broker at `KAFKA_BROKERS` (default
//! `localhost:9092`) with topic auto-creation enabled, and are ignored by
//! default:
//!
//!   cargo test --test kafka -- --ignored

mod consume_e2e;
