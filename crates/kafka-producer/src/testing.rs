//! In-memory sink for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, SendError};
use crate::sink::MessageSink;

/// A record accepted by [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp_ms: i64,
    pub timeout: Duration,
}

/// Sink that records every send, optionally failing or stalling.
pub struct RecordingSink {
    topic: String,
    sent: Mutex<Vec<SentRecord>>,
    attempts: AtomicUsize,
    flushes: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingSink {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            flushes: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    /// Make every subsequent send fail with [`SendError::Transport`].
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent send wait this long before completing.
    pub fn delay_sends(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(
        &self,
        key: &[u8],
        value: &[u8],
        timestamp_ms: i64,
        timeout: Duration,
    ) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(SendError::Transport(format!(
                "simulated send failure to '{}'",
                self.topic
            )));
        }

        self.sent.lock().unwrap().push(SentRecord {
            key: key.to_vec(),
            value: value.to_vec(),
            timestamp_ms,
            timeout,
        });
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destination(&self) -> &str {
        &self.topic
    }
}
