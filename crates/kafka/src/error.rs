use kafka_relay_producer::SendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Consumer error: {0}")]
    Consumer(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize reader for topic '{topic}': {source}")]
    Initialization {
        topic: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Producer error: {0}")]
    Producer(#[from] SendError),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
