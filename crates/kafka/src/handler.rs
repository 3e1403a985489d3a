//! Application message handlers.

use std::future::Future;

use async_trait::async_trait;
use kafka_types::HandlerResult;
use tokio_util::sync::CancellationToken;

/// Where and when a handler invocation happens.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// 1-based attempt number for this message
    pub attempt: u32,
    /// Fires when the consumer group is stopping.
    ///
    /// The worker never interrupts a running handler; long-running handlers may
    /// watch this token to finish early.
    pub cancel: CancellationToken,
}

/// Processes one message.
///
/// Handlers must tolerate being called more than once for the same message:
/// retries call it again after a failure, and a failed commit causes the
/// broker to redeliver.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext, key: &[u8], value: &[u8]) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(HandlerContext, Vec<u8>, Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, ctx: &HandlerContext, key: &[u8], value: &[u8]) -> HandlerResult {
        (self)(ctx.clone(), key.to_vec(), value.to_vec()).await
    }
}
