use crate::config::ConsumerConfig;
use crate::consumer::KafkaReaderFactory;
use crate::error::{Error, Result};
use crate::handler::MessageHandler;
use crate::reader::{PartitionReader, ReaderFactory};
use crate::retry::RetryPolicy;
use crate::stats::{StatsSnapshot, WorkerStats};
use crate::worker::{PartitionWorker, DEFAULT_FETCH_BACKOFF};
use kafka_relay_producer::DeadLetterRouter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WorkerHandle = JoinHandle<Box<dyn PartitionReader>>;

enum GroupState {
    Idle,
    Running(Vec<WorkerHandle>),
    Stopped,
}

/// Builder for [`ConsumerGroup`].
pub struct ConsumerGroupBuilder {
    config: ConsumerConfig,
    handler: Arc<dyn MessageHandler>,
    retry: RetryPolicy,
    dead_letter: Option<DeadLetterRouter>,
    fetch_backoff: Duration,
}

impl ConsumerGroupBuilder {
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Route messages that exhaust their retries to this router.
    pub fn dead_letter(mut self, router: DeadLetterRouter) -> Self {
        self.dead_letter = Some(router);
        self
    }

    pub fn fetch_backoff(mut self, backoff: Duration) -> Self {
        self.fetch_backoff = backoff;
        self
    }

    pub fn build(self, factory: impl ReaderFactory + 'static) -> ConsumerGroup {
        ConsumerGroup {
            config: self.config,
            factory: Box::new(factory),
            handler: self.handler,
            retry: self.retry,
            dead_letter: self.dead_letter.map(Arc::new),
            fetch_backoff: self.fetch_backoff,
            cancel: CancellationToken::new(),
            stats: Arc::new(WorkerStats::new()),
            state: Mutex::new(GroupState::Idle),
        }
    }
}

/// A set of partition workers sharing one handler, one retry policy, one
/// optional dead-letter router and one cancellation token.
///
/// - `start` creates one reader per configured topic and spawns one worker task
///   per reader. Calling it again while running does nothing.
/// - `stop` cancels all workers, waits for every one of them to exit, then
///   closes the readers and the dead-letter router. Calling it again does nothing.
///
/// Dropping a running group cancels its workers without waiting for them.
pub struct ConsumerGroup {
    config: ConsumerConfig,
    factory: Box<dyn ReaderFactory>,
    handler: Arc<dyn MessageHandler>,
    retry: RetryPolicy,
    dead_letter: Option<Arc<DeadLetterRouter>>,
    fetch_backoff: Duration,
    cancel: CancellationToken,
    stats: Arc<WorkerStats>,
    state: Mutex<GroupState>,
}

impl ConsumerGroup {
    pub fn builder(
        config: ConsumerConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> ConsumerGroupBuilder {
        ConsumerGroupBuilder {
            config,
            handler,
            retry: RetryPolicy::default(),
            dead_letter: None,
            fetch_backoff: DEFAULT_FETCH_BACKOFF,
        }
    }

    /// Create the readers and spawn the workers.
    ///
    /// Fails if any reader cannot be created; readers created before the
    /// failure are closed and no worker is started.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match *state {
            GroupState::Idle => {}
            GroupState::Running(_) => {
                debug!(group_id = %self.config.group_id, "Consumer group already running");
                return Ok(());
            }
            GroupState::Stopped => {
                return Err(Error::Consumer(
                    "a stopped consumer group cannot be restarted".to_string(),
                ));
            }
        }

        self.config.validate()?;

        let mut readers = Vec::with_capacity(self.config.topics.len());
        for topic in &self.config.topics {
            match self.factory.create_reader(&self.config, topic).await {
                Ok(reader) => readers.push(reader),
                Err(e) => {
                    close_readers(readers).await;
                    return Err(Error::Initialization {
                        topic: topic.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(
            group_id = %self.config.group_id,
            topics = ?self.config.topics,
            retries = self.retry.max_attempts,
            dlq_topic = ?self.dead_letter.as_ref().map(|r| r.topic()),
            "Consumer group initialized"
        );

        let handles = readers
            .into_iter()
            .map(|reader| {
                let worker = PartitionWorker::new(
                    reader,
                    Arc::clone(&self.handler),
                    self.retry,
                    self.cancel.clone(),
                )
                .with_dead_letter(self.dead_letter.clone())
                .with_fetch_backoff(self.fetch_backoff)
                .with_stats(Arc::clone(&self.stats));
                tokio::spawn(worker.run())
            })
            .collect::<Vec<_>>();

        info!(
            group_id = %self.config.group_id,
            "Consumer group started with {} workers",
            handles.len()
        );
        *state = GroupState::Running(handles);
        Ok(())
    }

    /// Cancel all workers, wait for them, and release every transport.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let handles = match std::mem::replace(&mut *state, GroupState::Stopped) {
            GroupState::Running(handles) => handles,
            GroupState::Idle => Vec::new(),
            GroupState::Stopped => {
                debug!(group_id = %self.config.group_id, "Consumer group already stopped");
                return Ok(());
            }
        };

        self.cancel.cancel();

        let mut readers = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(reader) => readers.push(reader),
                Err(e) => {
                    error!(
                        group_id = %self.config.group_id,
                        error = %e,
                        "Partition worker task failed"
                    );
                    first_error.get_or_insert(Error::Join(e));
                }
            }
        }
        close_readers(readers).await;

        if let Some(router) = &self.dead_letter {
            if let Err(e) = router.close().await {
                warn!(dlq_topic = router.topic(), error = %e, "Failed to close dead-letter router");
            }
        }

        info!(group_id = %self.config.group_id, "Consumer group stopped");
        first_error.map_or(Ok(()), Err)
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, GroupState::Running(_))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Token fired by [`ConsumerGroup::stop`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for ConsumerGroup {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn close_readers(readers: Vec<Box<dyn PartitionReader>>) {
    for mut reader in readers {
        if let Err(e) = reader.close().await {
            warn!(topic = reader.topic(), error = %e, "Failed to close reader");
        }
    }
}

/// Build and start a consumer group on Kafka.
///
/// Every message of every topic in `config.topics` is passed to `handler`,
/// retried `retry_count` times with `retry_delay` in between, and forwarded to
/// `dlq_topic` (when given and non-empty) if all attempts fail.
///
/// Returns an error if the configuration is invalid or a broker cannot be
/// reached; no worker is left running in that case.
pub async fn init_consumer(
    config: ConsumerConfig,
    handler: Arc<dyn MessageHandler>,
    retry_count: u32,
    retry_delay: Duration,
    dlq_topic: Option<&str>,
) -> Result<ConsumerGroup> {
    config.validate()?;

    let mut builder = ConsumerGroup::builder(config.clone(), handler)
        .retry_policy(RetryPolicy::fixed(retry_count, retry_delay));

    if let Some(topic) = dlq_topic.map(str::trim).filter(|t| !t.is_empty()) {
        builder = builder.dead_letter(DeadLetterRouter::connect(&config.brokers, topic)?);
    }

    let group = builder.build(KafkaReaderFactory);
    group.start().await?;
    Ok(group)
}
