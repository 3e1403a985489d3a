//! Single-destination producer with a bounded send timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Result, SendError};
use crate::sink::{KafkaSink, MessageSink};

/// Default upper bound for one send, including broker acknowledgement.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends key/value records to one fixed topic.
///
/// `send` takes `&self`, so a producer can be shared behind an `Arc` and used
/// from many tasks at once. There is no internal retry: callers decide whether
/// a failed send matters.
pub struct Producer {
    sink: Arc<dyn MessageSink>,
    send_timeout: Duration,
    closed: AtomicBool,
}

impl Producer {
    pub fn new(sink: impl MessageSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    /// Create a producer for `topic` on the given brokers.
    pub fn connect(brokers: &[String], topic: &str) -> Result<Self> {
        Self::connect_with_timeout(brokers, topic, DEFAULT_SEND_TIMEOUT)
    }

    /// Like [`Producer::connect`], with librdkafka's `message.timeout.ms` and
    /// the producer's own send timeout both set to `send_timeout`.
    pub fn connect_with_timeout(
        brokers: &[String],
        topic: &str,
        send_timeout: Duration,
    ) -> Result<Self> {
        let sink = KafkaSink::new(brokers, topic, send_timeout)?;
        info!("Producer initialized for topic '{topic}'");
        Ok(Self::new(sink).with_send_timeout(send_timeout))
    }

    /// Override the send timeout.
    ///
    /// This bounds the wait on our side only; for a [`KafkaSink`] prefer
    /// [`Producer::connect_with_timeout`] so librdkafka gives up at the same time.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn destination(&self) -> &str {
        self.sink.destination()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send one record stamped with the current time.
    ///
    /// Fails with [`SendError::Timeout`] if the transport does not complete
    /// within the send timeout, and with [`SendError::Closed`] once
    /// [`Producer::close`] has been called.
    pub async fn send(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }

        let timestamp_ms = Utc::now().timestamp_millis();
        let delivery = self
            .sink
            .send(key, value, timestamp_ms, self.send_timeout);

        match tokio::time::timeout(self.send_timeout, delivery).await {
            Ok(result) => {
                if result.is_ok() {
                    debug!(
                        topic = self.destination(),
                        key = %String::from_utf8_lossy(key),
                        "Record sent"
                    );
                }
                result
            }
            Err(_) => Err(SendError::Timeout(self.send_timeout)),
        }
    }

    /// Flush and release the transport.
    ///
    /// Only the first call touches the transport; later calls return `Ok(())`.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.sink.flush(self.send_timeout).await?;
        info!(topic = self.destination(), "Producer closed");
        Ok(())
    }
}
