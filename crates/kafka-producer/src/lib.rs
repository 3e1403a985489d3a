//! Kafka producer library for kafka-relay.
//!
//! This library provides:
//!
//! - **Producer**: sends key/value records to one fixed topic with a bounded
//!   send timeout and no internal retry
//! - **Dead-letter router**: a producer bound to the dead-letter topic, used by
//!   the consumer when a message exhausts its retries
//! - **Send transports**: the [`MessageSink`] seam and its rdkafka-backed
//!   implementation [`KafkaSink`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kafka_relay_producer::Producer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let brokers = vec!["localhost:9092".to_string()];
//!     let producer = Producer::connect(&brokers, "test-topic")?;
//!
//!     producer.send(b"key-0", b"hello").await?;
//!     producer.close().await?;
//!     Ok(())
//! }
//! ```

pub mod dead_letter;
pub mod error;
pub mod producer;
pub mod sink;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use dead_letter::DeadLetterRouter;
pub use error::{Result, SendError};
pub use producer::{Producer, DEFAULT_SEND_TIMEOUT};
pub use sink::{KafkaSink, MessageSink};
