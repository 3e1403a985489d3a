//! kafka-relay library
//!
//! Host-side pieces of the `kafka-relay` command: configuration loading,
//! logging setup and the demo message handler.
//!
//! # Crates
//!
//! The messaging core lives in dedicated crates:
//!
//! - `kafka_types` - `Message` and `HandlerResult`
//! - `kafka_relay_producer` - producer and dead-letter router
//! - `kafka_relay_consumer` - consumer group, partition workers and retry policy
//!
//! # CLI Usage
//!
//! ```bash
//! # Consume with retries and a dead-letter topic
//! kafka-relay consume --config relay.yaml --dlq-topic orders-dlq
//!
//! # Produce a few messages
//! kafka-relay produce --brokers localhost:9092 --topic orders --key k1 hello world
//! ```

pub mod config;
pub mod handler;
pub mod logging;

pub use config::{ConsumeOverrides, RelayConfig};
pub use handler::LoggingHandler;
pub use logging::init_logging;
