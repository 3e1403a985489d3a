//! Produce to a fresh topic, consume it with failures injected, and check the
//! dead-letter topic receives exactly the messages that exhausted their retries.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use kafka_relay_consumer::{init_consumer, ConsumerConfig, HandlerContext, HandlerResult};
use kafka_relay_producer::Producer;

fn brokers() -> Vec<String> {
    std::env::var("KAFKA_BROKERS")
        .unwrap_or_else(|_| "localhost:9092".to_string())
        .split(',')
        .map(str::to_string)
        .collect()
}

fn test_id() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    condition()
}

#[tokio::test]
#[ignore = "requires a Kafka broker"]
async fn test_retry_and_dead_letter_against_broker() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_relay_consumer=debug,kafka_relay_producer=debug")
        .try_init()
        .ok();

    let id = test_id();
    let topic = format!("relay-e2e-{id}");
    let dlq_topic = format!("relay-e2e-{id}-dlq");
    let brokers = brokers();

    let producer = Producer::connect(&brokers, &topic)?;
    for i in 0..10 {
        let key = if i % 5 == 0 { "poison" } else { "ok" };
        producer
            .send(key.as_bytes(), format!("msg-{i}").as_bytes())
            .await?;
    }
    producer.close().await?;

    // Attempts per value
    let seen: Arc<Mutex<BTreeMap<String, u32>>> = Arc::default();
    let handler = {
        let seen = Arc::clone(&seen);
        move |_ctx: HandlerContext, key: Vec<u8>, value: Vec<u8>| {
            let seen = Arc::clone(&seen);
            async move {
                let value = String::from_utf8_lossy(&value).to_string();
                *seen.lock().unwrap().entry(value).or_default() += 1;
                if key == b"poison" {
                    HandlerResult::failure("poison message")
                } else {
                    HandlerResult::Success
                }
            }
        }
    };

    let config = ConsumerConfig::new(brokers.clone(), &format!("relay-e2e-{id}"), [&topic]);
    let group = init_consumer(
        config,
        Arc::new(handler),
        2,
        Duration::from_millis(100),
        Some(&dlq_topic),
    )
    .await?;

    let consumed = wait_for(Duration::from_secs(60), || group.stats().committed == 10).await;
    group.stop().await?;
    assert!(consumed, "stats: {:?}", group.stats());

    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        assert_eq!(seen["msg-0"], 3);
        assert_eq!(seen["msg-5"], 3);
        assert_eq!(seen["msg-1"], 1);
    }
    let stats = group.stats();
    assert_eq!(stats.dead_lettered, 2);
    assert_eq!(stats.succeeded, 8);

    // Read the dead-letter topic back
    let dead: Arc<Mutex<Vec<(Vec<u8>, Vec<u8>)>>> = Arc::default();
    let collector = {
        let dead = Arc::clone(&dead);
        move |_ctx: HandlerContext, key: Vec<u8>, value: Vec<u8>| {
            let dead = Arc::clone(&dead);
            async move {
                dead.lock().unwrap().push((key, value));
                HandlerResult::Success
            }
        }
    };
    let config = ConsumerConfig::new(brokers, &format!("relay-e2e-{id}-dlq"), [&dlq_topic]);
    let dlq_group = init_consumer(config, Arc::new(collector), 0, Duration::ZERO, None).await?;
    let drained = wait_for(Duration::from_secs(60), || dead.lock().unwrap().len() == 2).await;
    dlq_group.stop().await?;
    assert!(drained);

    let mut dead = dead.lock().unwrap().clone();
    dead.sort();
    assert_eq!(
        dead,
        vec![
            (b"poison".to_vec(), b"msg-0".to_vec()),
            (b"poison".to_vec(), b"msg-5".to_vec()),
        ]
    );
    Ok(())
}
