use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kafka_relay_consumer::{init_consumer, ConsumerConfig, HandlerContext, HandlerResult};

/// Example consuming two topics in one consumer group
///
/// This example shows how to:
/// 1. Configure a consumer group over several topics
/// 2. Write a handler that fails for some messages
/// 3. Retry failed messages and forward the rest to a dead-letter topic
/// 4. Stop the group cleanly on Ctrl+C
///
/// To run this example:
/// 1. Start Kafka with Docker
///   docker run -d --name kafka -p 9092:9092 apache/kafka:latest
/// 2. Run the example
///   cargo run --example multi_consumer
/// 3. Produce messages; values that are not valid UTF-8 end up in `user-events-dlq`

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    match run_main().await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<()> {
    let config = ConsumerConfig::new(
        vec!["localhost:9092".to_string()],
        "multi-consumer-example",
        ["user-events", "user-audit"],
    );

    let processed_count = Arc::new(AtomicU64::new(0));

    let handler = {
        let counter = Arc::clone(&processed_count);
        move |ctx: HandlerContext, key: Vec<u8>, value: Vec<u8>| {
            let counter = Arc::clone(&counter);
            async move {
                let Ok(text) = std::str::from_utf8(&value) else {
                    return HandlerResult::failure("value is not valid UTF-8");
                };

                println!(
                    "[{} / partition {} / offset {} / attempt {}] {}: {}",
                    ctx.topic,
                    ctx.partition,
                    ctx.offset,
                    ctx.attempt,
                    String::from_utf8_lossy(&key),
                    text
                );

                let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if count % 100 == 0 {
                    println!("Processed {count} messages total");
                }
                HandlerResult::Success
            }
        }
    };

    let group = init_consumer(
        config,
        Arc::new(handler),
        2,
        Duration::from_millis(500),
        Some("user-events-dlq"),
    )
    .await?;

    println!("Consumers running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    group.stop().await?;
    println!(
        "Stopped after {} messages: {:?}",
        processed_count.load(Ordering::SeqCst),
        group.stats()
    );

    Ok(())
}
