//! Fetch, handle, retry, dead-letter, commit loop for one reader.

use std::sync::Arc;
use std::time::Duration;

use kafka_relay_producer::DeadLetterRouter;
use kafka_types::{HandlerResult, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handler::{HandlerContext, MessageHandler};
use crate::reader::PartitionReader;
use crate::retry::RetryPolicy;
use crate::stats::WorkerStats;

/// Pause after a failed fetch before fetching again.
pub const DEFAULT_FETCH_BACKOFF: Duration = Duration::from_secs(1);

/// How far a message got before the worker moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Handled,
    Exhausted,
    /// Stop was requested during a retry delay. The message is left
    /// uncommitted so the broker redelivers it.
    Interrupted,
}

/// Drives one reader until the group's cancellation token fires.
///
/// Every fetched message is committed exactly once after its handling is
/// complete, whether the handler succeeded, retries ran out and it was
/// dead-lettered, or it was dropped. The next message is fetched only after
/// that commit, which keeps per-partition processing in offset order.
pub struct PartitionWorker {
    reader: Box<dyn PartitionReader>,
    handler: Arc<dyn MessageHandler>,
    retry: RetryPolicy,
    dead_letter: Option<Arc<DeadLetterRouter>>,
    cancel: CancellationToken,
    fetch_backoff: Duration,
    stats: Arc<WorkerStats>,
}

impl PartitionWorker {
    pub fn new(
        reader: Box<dyn PartitionReader>,
        handler: Arc<dyn MessageHandler>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reader,
            handler,
            retry,
            dead_letter: None,
            cancel,
            fetch_backoff: DEFAULT_FETCH_BACKOFF,
            stats: Arc::new(WorkerStats::new()),
        }
    }

    pub fn with_dead_letter(mut self, router: Option<Arc<DeadLetterRouter>>) -> Self {
        self.dead_letter = router;
        self
    }

    pub fn with_fetch_backoff(mut self, backoff: Duration) -> Self {
        self.fetch_backoff = backoff;
        self
    }

    pub fn with_stats(mut self, stats: Arc<WorkerStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Run until cancelled, then hand the reader back so the owner can close it.
    pub async fn run(mut self) -> Box<dyn PartitionReader> {
        let topic = self.reader.topic().to_string();
        info!(topic = %topic, "Partition worker started");

        while let Some(message) = self.next_message().await {
            match self.deliver(&message).await {
                Delivery::Handled | Delivery::Exhausted => self.commit(&message).await,
                Delivery::Interrupted => break,
            }
        }

        info!(topic = %topic, "Partition worker stopped");
        self.reader
    }

    /// Fetch the next message, retrying fetch errors until cancelled.
    async fn next_message(&mut self) -> Option<Message> {
        loop {
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                fetched = self.reader.fetch() => fetched,
            };

            match fetched {
                Ok(message) => {
                    self.stats.record_fetched();
                    debug!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        "Fetched message"
                    );
                    return Some(message);
                }
                Err(e) => {
                    self.stats.record_fetch_error();
                    warn!(
                        topic = self.reader.topic(),
                        error = %e,
                        "Fetch error, retrying in {:?}",
                        self.fetch_backoff
                    );
                    if !self.pause(self.fetch_backoff).await {
                        return None;
                    }
                }
            }
        }
    }

    /// Invoke the handler up to `1 + max_attempts` times, then dead-letter or drop.
    async fn deliver(&self, message: &Message) -> Delivery {
        let total_attempts = self.retry.total_attempts();

        for attempt in 1..=total_attempts {
            let ctx = HandlerContext {
                topic: message.topic.clone(),
                partition: message.partition,
                offset: message.offset,
                attempt,
                cancel: self.cancel.clone(),
            };

            match self.handler.handle(&ctx, &message.key, &message.value).await {
                HandlerResult::Success => {
                    self.stats.record_succeeded();
                    return Delivery::Handled;
                }
                HandlerResult::Failure(cause) => {
                    let cause = format!("{cause:#}");
                    warn!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        attempt,
                        error = %cause,
                        "Handler failed, attempt {attempt}/{total_attempts}"
                    );
                }
            }

            if attempt < total_attempts {
                self.stats.record_retried();
                if !self.pause(self.retry.delay_for(attempt)).await {
                    info!(
                        topic = %message.topic,
                        partition = message.partition,
                        offset = message.offset,
                        "Stopped during retry delay, leaving message uncommitted"
                    );
                    return Delivery::Interrupted;
                }
            }
        }

        self.dead_letter(message, total_attempts).await;
        Delivery::Exhausted
    }

    async fn dead_letter(&self, message: &Message, attempts: u32) {
        let Some(router) = &self.dead_letter else {
            self.stats.record_dropped();
            warn!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                key = %message.key_lossy(),
                "Dropping message after {attempts} failed attempts, no dead-letter topic configured"
            );
            return;
        };

        match router.route(message).await {
            Ok(()) => {
                self.stats.record_dead_lettered();
                info!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    key = %message.key_lossy(),
                    dlq_topic = router.topic(),
                    "Message sent to dead-letter topic"
                );
            }
            Err(e) => {
                self.stats.record_dead_letter_failure();
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    key = %message.key_lossy(),
                    dlq_topic = router.topic(),
                    error = %e,
                    "Dead-letter send failed"
                );
            }
        }
    }

    async fn commit(&mut self, message: &Message) {
        match self.reader.commit(message).await {
            Ok(()) => self.stats.record_committed(),
            Err(e) => {
                self.stats.record_commit_failure();
                error!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Commit failed"
                );
            }
        }
    }

    /// Sleep for `duration`. Returns `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
