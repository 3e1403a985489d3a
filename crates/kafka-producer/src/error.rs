//! Error types for the producer crate.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::Producer::send`] and [`crate::DeadLetterRouter::route`].
///
/// The transport error is returned verbatim; the producer never retries on its own.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    #[error("Producer is closed")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, SendError>;
