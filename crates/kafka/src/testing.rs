//! In-memory transports and handlers for tests.
//!
//! Enabled under `cfg(test)` and with the `test-utils` feature.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kafka_types::{HandlerResult, Message};
use tokio::sync::mpsc;

use crate::config::ConsumerConfig;
use crate::error::{Error, Result};
use crate::handler::{HandlerContext, MessageHandler};
use crate::reader::{PartitionReader, ReaderFactory};

pub use kafka_relay_producer::testing::{RecordingSink, SentRecord};

/// What a [`MemoryReader`] observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Fetched(i64),
    FetchFailed,
    Committed(i64),
    CommitFailed(i64),
    Closed,
}

enum FetchStep {
    Message(Message),
    Error(String),
}

/// Reader fed through a [`MemoryReaderHandle`].
///
/// `fetch` waits until the handle pushes something, the way a broker fetch
/// waits for new records.
pub struct MemoryReader {
    topic: String,
    steps: mpsc::UnboundedReceiver<FetchStep>,
    events: Arc<Mutex<Vec<ReaderEvent>>>,
    fail_commits: Arc<AtomicBool>,
}

/// Test-side end of a [`MemoryReader`].
#[derive(Clone)]
pub struct MemoryReaderHandle {
    topic: String,
    steps: mpsc::UnboundedSender<FetchStep>,
    events: Arc<Mutex<Vec<ReaderEvent>>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryReader {
    pub fn new(topic: &str) -> (Self, MemoryReaderHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = Arc::new(Mutex::new(Vec::new()));
        let fail_commits = Arc::new(AtomicBool::new(false));

        let reader = Self {
            topic: topic.to_string(),
            steps: rx,
            events: Arc::clone(&events),
            fail_commits: Arc::clone(&fail_commits),
        };
        let handle = MemoryReaderHandle {
            topic: topic.to_string(),
            steps: tx,
            events,
            fail_commits,
        };
        (reader, handle)
    }

    fn record(&self, event: ReaderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl PartitionReader for MemoryReader {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn fetch(&mut self) -> Result<Message> {
        match self.steps.recv().await {
            Some(FetchStep::Message(message)) => {
                self.record(ReaderEvent::Fetched(message.offset));
                Ok(message)
            }
            Some(FetchStep::Error(reason)) => {
                self.record(ReaderEvent::FetchFailed);
                Err(Error::Consumer(reason))
            }
            // Every handle is gone; behave like an idle topic
            None => std::future::pending().await,
        }
    }

    async fn commit(&mut self, message: &Message) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            self.record(ReaderEvent::CommitFailed(message.offset));
            return Err(Error::Consumer("simulated commit failure".to_string()));
        }
        self.record(ReaderEvent::Committed(message.offset));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.record(ReaderEvent::Closed);
        Ok(())
    }
}

impl MemoryReaderHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Make a message available to the next fetch.
    pub fn push(&self, partition: i32, offset: i64, key: &[u8], value: &[u8]) {
        let message = Message::new(self.topic.clone(), partition, offset, key, value);
        // The reader side may already be dropped after a stopped worker
        self.steps.send(FetchStep::Message(message)).ok();
    }

    /// Make the next fetch fail.
    pub fn push_fetch_error(&self, reason: &str) {
        self.steps.send(FetchStep::Error(reason.to_string())).ok();
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ReaderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn committed_offsets(&self) -> Vec<i64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReaderEvent::Committed(offset) => Some(offset),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == ReaderEvent::Closed)
            .count()
    }
}

/// Hands out pre-registered [`MemoryReader`]s by topic.
#[derive(Default)]
pub struct MemoryReaderFactory {
    readers: Mutex<HashMap<String, MemoryReader>>,
    unreachable: Mutex<HashSet<String>>,
    created: AtomicUsize,
}

impl MemoryReaderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader for `topic` and return its handle.
    pub fn add_topic(&self, topic: &str) -> MemoryReaderHandle {
        let (reader, handle) = MemoryReader::new(topic);
        self.readers
            .lock()
            .unwrap()
            .insert(topic.to_string(), reader);
        handle
    }

    /// Make reader creation for `topic` fail as if the broker were down.
    pub fn make_unreachable(&self, topic: &str) {
        self.unreachable.lock().unwrap().insert(topic.to_string());
    }

    /// Number of readers handed out so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReaderFactory for MemoryReaderFactory {
    async fn create_reader(
        &self,
        _config: &ConsumerConfig,
        topic: &str,
    ) -> Result<Box<dyn PartitionReader>> {
        if self.unreachable.lock().unwrap().contains(topic) {
            return Err(Error::Consumer(format!("broker unreachable for '{topic}'")));
        }

        let reader = self
            .readers
            .lock()
            .unwrap()
            .remove(topic)
            .ok_or_else(|| Error::Consumer(format!("no reader registered for '{topic}'")))?;

        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(reader))
    }
}

/// One handler invocation seen by [`ScriptedHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerCall {
    pub topic: String,
    pub offset: i64,
    pub attempt: u32,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Handler that returns scripted outcomes and records every call.
///
/// Outcomes are consumed one per call; once the script is empty the default
/// outcome applies.
pub struct ScriptedHandler {
    script: Mutex<VecDeque<bool>>,
    default_success: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<HandlerCall>>,
}

impl ScriptedHandler {
    pub fn always_succeed() -> Self {
        Self::with_script([], true)
    }

    pub fn always_fail() -> Self {
        Self::with_script([], false)
    }

    /// Fail the first `failures` calls, succeed afterwards.
    pub fn fail_times(failures: usize) -> Self {
        Self::with_script(std::iter::repeat(false).take(failures), true)
    }

    pub fn with_script(script: impl IntoIterator<Item = bool>, default_success: bool) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            default_success,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Take this long for every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageHandler for ScriptedHandler {
    async fn handle(&self, ctx: &HandlerContext, key: &[u8], value: &[u8]) -> HandlerResult {
        self.calls.lock().unwrap().push(HandlerCall {
            topic: ctx.topic.clone(),
            offset: ctx.offset,
            attempt: ctx.attempt,
            key: key.to_vec(),
            value: value.to_vec(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let success = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_success);

        if success {
            HandlerResult::Success
        } else {
            HandlerResult::failure(format!("scripted failure at offset {}", ctx.offset))
        }
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
