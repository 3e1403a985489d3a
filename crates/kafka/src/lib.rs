//! Kafka consumer library for kafka-relay.
//!
//! Consumes one or more topics in a consumer group and hands every message to
//! an application [`MessageHandler`]. Failed messages are retried a bounded
//! number of times and, once retries are exhausted, forwarded to a dead-letter
//! topic (or dropped with a warning when none is configured). The offset of
//! every message is committed once its handling is complete.
//!
//! Features:
//!
//! - Partition workers: one task per topic, processing messages in offset order
//! - Bounded retries: fixed delay by default, exponential backoff on request
//! - Dead-letter routing: original key and value forwarded unchanged
//! - Graceful shutdown: cancellation interrupts fetches and retry delays, never
//!   a running handler
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use kafka_relay_consumer::{init_consumer, ConsumerConfig, HandlerContext, HandlerResult};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConsumerConfig::new(
//!         vec!["localhost:9092".to_string()],
//!         "orders-service",
//!         ["orders"],
//!     );
//!
//!     let handler = Arc::new(|ctx: HandlerContext, _key: Vec<u8>, value: Vec<u8>| async move {
//!         println!("{}@{}: {} bytes", ctx.topic, ctx.offset, value.len());
//!         HandlerResult::Success
//!     });
//!
//!     let retry_delay = Duration::from_secs(1);
//!     let group = init_consumer(config, handler, 3, retry_delay, Some("orders-dlq")).await?;
//!     tokio::signal::ctrl_c().await?;
//!     group.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod config;

/// rdkafka-backed reader and reader factory
pub mod consumer;
pub mod error;

/// Consumer group lifecycle: start, stop and the `init_consumer` entry point
pub mod group;
pub mod handler;
pub mod reader;
pub mod retry;
pub mod stats;
pub mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::ConsumerConfig;
pub use consumer::{KafkaReader, KafkaReaderFactory};
pub use error::{Error, Result};
pub use group::{init_consumer, ConsumerGroup, ConsumerGroupBuilder};
pub use handler::{HandlerContext, MessageHandler};
pub use kafka_types::{HandlerResult, Message};
pub use reader::{PartitionReader, ReaderFactory};
pub use retry::{Backoff, RetryPolicy};
pub use stats::{StatsSnapshot, WorkerStats};
pub use worker::{PartitionWorker, DEFAULT_FETCH_BACKOFF};
