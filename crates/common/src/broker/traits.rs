use crate::broker::{AcknowledgeableMessage, BrokerError, BrokerMessage};
use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// Lazy stream of deliveries for one channel.
///
/// Ends when the subscription's token is cancelled or the backend hits a
/// connection-level error; either way the caller must subscribe again.
pub type BrokerSubscription = BoxStream<'static, AcknowledgeableMessage>;

/// Durable publish/subscribe with explicit per-message acknowledgement
#[async_trait]
pub trait BrokerController: Send + Sync {
    /// Declare the channel if needed and enqueue `message` durably
    async fn publish(&self, channel: &str, message: BrokerMessage) -> Result<(), BrokerError>;

    /// Start consuming `channel` with a prefetch of one: the next message is
    /// only delivered after the previous one has been settled
    async fn subscribe(
        &self,
        channel: &str,
        cancel: CancellationToken,
    ) -> Result<BrokerSubscription, BrokerError>;
}

/// Queue name for a channel; dots are not allowed in stream names
pub fn channel_queue_name(channel: &str) -> String {
    channel.replace('.', "_")
}
