//! Command-line interface for kafka-relay
//!
//! # Usage Examples
//!
//! ## Consume
//! ```bash
//! # Consume with settings from a file
//! kafka-relay consume --config relay.yaml
//!
//! # Override the file, and fail 30% of handler calls to exercise retries
//! kafka-relay consume --config relay.yaml \
//!   --topics orders,payments \
//!   --retry-count 2 --retry-delay 500ms \
//!   --dlq-topic orders-dlq \
//!   --fail-rate 0.3
//! ```
//!
//! ## Produce
//! ```bash
//! # Send the given values
//! kafka-relay produce --brokers localhost:9092 --topic orders --key k1 first second
//!
//! # Send one message per stdin line
//! seq 1 100 | kafka-relay produce --topic orders
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kafka_relay::config::{parse_duration, ConsumeOverrides, LoggingSection, RelayConfig};
use kafka_relay::{init_logging, LoggingHandler};
use kafka_relay_consumer::init_consumer;
use kafka_relay_producer::{Producer, DEFAULT_SEND_TIMEOUT};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "kafka-relay")]
#[command(about = "Reliable Kafka consumer with retries and dead-letter routing")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume topics with the demo handler until Ctrl-C or SIGTERM
    Consume {
        /// YAML configuration file
        #[arg(long, env = "KAFKA_RELAY_CONFIG")]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConsumeOverrides,

        /// Probability in [0, 1] that the demo handler fails a call
        #[arg(long, default_value_t = 0.0)]
        fail_rate: f64,
    },

    /// Send messages to a topic
    Produce {
        /// Kafka brokers (comma-separated)
        #[arg(
            long,
            env = "KAFKA_BROKERS",
            value_delimiter = ',',
            default_value = "localhost:9092"
        )]
        brokers: Vec<String>,

        /// Destination topic
        #[arg(long)]
        topic: String,

        /// Key for every message (empty when omitted)
        #[arg(long)]
        key: Option<String>,

        /// Per-message send timeout
        #[arg(long, value_parser = parse_duration)]
        send_timeout: Option<Duration>,

        /// Message values; read from stdin, one per line, when omitted
        values: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Consume {
            config,
            overrides,
            fail_rate,
        } => run_consume(config, overrides, fail_rate).await,
        Commands::Produce {
            brokers,
            topic,
            key,
            send_timeout,
            values,
        } => {
            init_logging(&LoggingSection::default())?;
            run_produce(
                brokers,
                topic,
                key.unwrap_or_default(),
                send_timeout.unwrap_or(DEFAULT_SEND_TIMEOUT),
                values,
            )
            .await
        }
    }
}

async fn run_consume(
    config_path: Option<PathBuf>,
    overrides: ConsumeOverrides,
    fail_rate: f64,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::default(),
    };
    config.apply_overrides(&overrides);
    config.validate()?;

    init_logging(&config.logging)?;

    let handler = LoggingHandler::new(fail_rate)?;
    let group = init_consumer(
        config.consumer_config(),
        Arc::new(handler),
        config.retry.count,
        config.retry.delay,
        config.dead_letter_topic(),
    )
    .await
    .context("Failed to start consumer group")?;

    shutdown_signal().await?;
    info!("Shutdown signal received, stopping consumer group");

    group.stop().await.context("Failed to stop consumer group")?;
    info!(stats = ?group.stats(), "Exit");
    Ok(())
}

async fn run_produce(
    brokers: Vec<String>,
    topic: String,
    key: String,
    send_timeout: Duration,
    values: Vec<String>,
) -> anyhow::Result<()> {
    let producer = Producer::connect_with_timeout(&brokers, &topic, send_timeout)
        .with_context(|| format!("Failed to create producer for topic '{topic}'"))?;

    let mut sent = 0usize;
    if values.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            producer
                .send(key.as_bytes(), line.as_bytes())
                .await
                .with_context(|| format!("Failed to send message {sent}"))?;
            sent += 1;
        }
    } else {
        for value in &values {
            producer
                .send(key.as_bytes(), value.as_bytes())
                .await
                .with_context(|| format!("Failed to send message {sent}"))?;
            sent += 1;
        }
    }

    producer.close().await.context("Failed to close producer")?;
    info!(topic = %topic, "Sent {sent} messages");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C"),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}
