//! Demo message handler used by the `consume` command.

use async_trait::async_trait;
use kafka_relay_consumer::{HandlerContext, HandlerResult, MessageHandler};
use rand::Rng;
use tracing::info;

/// Logs every message and fails a configurable share of them at random.
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    fail_rate: f64,
}

impl LoggingHandler {
    /// `fail_rate` is the probability in `[0, 1]` that a call fails.
    pub fn new(fail_rate: f64) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&fail_rate) {
            anyhow::bail!("fail rate must be between 0 and 1, got {fail_rate}");
        }
        Ok(Self { fail_rate })
    }

    pub fn fail_rate(&self) -> f64 {
        self.fail_rate
    }
}

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, ctx: &HandlerContext, key: &[u8], value: &[u8]) -> HandlerResult {
        info!(
            topic = %ctx.topic,
            partition = ctx.partition,
            offset = ctx.offset,
            attempt = ctx.attempt,
            key = %String::from_utf8_lossy(key),
            value = %String::from_utf8_lossy(value),
            "Received message"
        );

        if rand::rng().random_bool(self.fail_rate) {
            return HandlerResult::failure("simulated handler error");
        }
        HandlerResult::Success
    }
}
