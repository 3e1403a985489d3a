//! Consumer group lifecycle against in-memory readers.

use std::sync::Arc;
use std::time::Duration;

use kafka_relay_consumer::testing::{
    wait_until, MemoryReaderFactory, ReaderEvent, RecordingSink, ScriptedHandler,
};
use kafka_relay_consumer::{ConsumerConfig, ConsumerGroup, Error, MessageHandler, RetryPolicy};
use kafka_relay_producer::{DeadLetterRouter, Producer};
use tokio_test::assert_ok;

const WAIT: Duration = Duration::from_secs(60);

fn config(topics: &[&str]) -> ConsumerConfig {
    ConsumerConfig::new(
        vec!["localhost:9092".to_string()],
        "relay-tests",
        topics.iter().copied(),
    )
}

fn dead_letter(sink: &Arc<RecordingSink>) -> DeadLetterRouter {
    DeadLetterRouter::new(Producer::new(Arc::clone(sink)))
}

#[tokio::test(start_paused = true)]
async fn test_group_consumes_every_topic() {
    let factory = Arc::new(MemoryReaderFactory::new());
    let orders = factory.add_topic("orders");
    let payments = factory.add_topic("payments");
    let handler = Arc::new(ScriptedHandler::always_succeed());

    let group = ConsumerGroup::builder(
        config(&["orders", "payments"]),
        Arc::clone(&handler) as Arc<dyn MessageHandler>,
    )
    .build(Arc::clone(&factory));
    assert_ok!(group.start().await);
    assert!(group.is_running().await);
    assert_eq!(factory.created(), 2);

    orders.push(0, 1, b"o1", b"order");
    payments.push(0, 7, b"p7", b"payment");
    payments.push(0, 8, b"p8", b"payment");

    let done = wait_until(WAIT, || {
        orders.committed_offsets().len() == 1 && payments.committed_offsets().len() == 2
    })
    .await;
    assert!(done, "orders: {:?}, payments: {:?}", orders.events(), payments.events());

    assert_ok!(group.stop().await);
    assert!(!group.is_running().await);

    let stats = group.stats();
    assert_eq!(stats.fetched, 3);
    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.committed, 3);

    let mut topics: Vec<String> = handler.calls().into_iter().map(|c| c.topic).collect();
    topics.sort();
    assert_eq!(topics, vec!["orders", "payments", "payments"]);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_noop() {
    let factory = Arc::new(MemoryReaderFactory::new());
    factory.add_topic("orders");

    let group = ConsumerGroup::builder(
        config(&["orders"]),
        Arc::new(ScriptedHandler::always_succeed()),
    )
    .build(Arc::clone(&factory));

    assert_ok!(group.start().await);
    assert_ok!(group.start().await);
    assert_eq!(factory.created(), 1);

    assert_ok!(group.stop().await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let factory = Arc::new(MemoryReaderFactory::new());
    let orders = factory.add_topic("orders");
    let sink = Arc::new(RecordingSink::new("orders-dlq"));

    let group = ConsumerGroup::builder(
        config(&["orders"]),
        Arc::new(ScriptedHandler::always_succeed()),
    )
    .dead_letter(dead_letter(&sink))
    .build(Arc::clone(&factory));
    assert_ok!(group.start().await);

    assert_ok!(group.stop().await);
    assert_ok!(group.stop().await);

    assert_eq!(orders.close_count(), 1);
    assert_eq!(sink.flush_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stopped_group_cannot_restart() {
    let factory = Arc::new(MemoryReaderFactory::new());
    factory.add_topic("orders");

    let group = ConsumerGroup::builder(
        config(&["orders"]),
        Arc::new(ScriptedHandler::always_succeed()),
    )
    .build(Arc::clone(&factory));
    assert_ok!(group.start().await);
    assert_ok!(group.stop().await);

    assert!(matches!(group.start().await, Err(Error::Consumer(_))));
    assert!(!group.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_failed_initialization_closes_created_readers() {
    let factory = Arc::new(MemoryReaderFactory::new());
    let audit = factory.add_topic("audit");
    factory.add_topic("orders");
    factory.make_unreachable("orders");

    let group = ConsumerGroup::builder(
        config(&["audit", "orders"]),
        Arc::new(ScriptedHandler::always_succeed()),
    )
    .build(Arc::clone(&factory));

    match group.start().await {
        Err(Error::Initialization { topic, .. }) => assert_eq!(topic, "orders"),
        other => panic!("expected initialization error, got {other:?}"),
    }
    assert!(!group.is_running().await);
    assert_eq!(audit.events(), vec![ReaderEvent::Closed]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_handler() {
    let factory = Arc::new(MemoryReaderFactory::new());
    let orders = factory.add_topic("orders");
    let handler = Arc::new(ScriptedHandler::always_succeed().with_delay(Duration::from_secs(3)));

    let group = ConsumerGroup::builder(
        config(&["orders"]),
        Arc::clone(&handler) as Arc<dyn MessageHandler>,
    )
    .build(Arc::clone(&factory));
    assert_ok!(group.start().await);

    orders.push(2, 40, b"k", b"v");
    assert!(wait_until(WAIT, || handler.call_count() == 1).await);

    assert_ok!(group.stop().await);
    assert_eq!(
        orders.events(),
        vec![
            ReaderEvent::Fetched(40),
            ReaderEvent::Committed(40),
            ReaderEvent::Closed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_messages_reach_dead_letter_topic() {
    let factory = Arc::new(MemoryReaderFactory::new());
    let orders = factory.add_topic("orders");
    let sink = Arc::new(RecordingSink::new("orders-dlq"));
    let handler = Arc::new(ScriptedHandler::with_script([false, false, true], true));

    let group = ConsumerGroup::builder(
        config(&["orders"]),
        Arc::clone(&handler) as Arc<dyn MessageHandler>,
    )
    .retry_policy(RetryPolicy::fixed(1, Duration::from_millis(100)))
    .dead_letter(dead_letter(&sink))
    .build(Arc::clone(&factory));
    assert_ok!(group.start().await);

    orders.push(0, 1, b"bad", b"first");
    orders.push(0, 2, b"good", b"second");
    assert!(wait_until(WAIT, || orders.committed_offsets() == vec![1, 2]).await);

    assert_ok!(group.stop().await);

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].key, b"bad");
    assert_eq!(sent[0].value, b"first");

    let stats = group.stats();
    assert_eq!(stats.dead_lettered, 1);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.retried, 1);
}
