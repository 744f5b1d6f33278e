use crate::broker::{
    AcknowledgeableMessage, BrokerController, BrokerError, BrokerMessage, BrokerSubscription,
    MessageAcker,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Default)]
struct ChannelQueue {
    messages: Mutex<VecDeque<BrokerMessage>>,
    available: Notify,
}

impl ChannelQueue {
    async fn push_back(&self, message: BrokerMessage) {
        self.messages.lock().await.push_back(message);
        self.available.notify_one();
    }

    async fn push_front(&self, message: BrokerMessage) {
        self.messages.lock().await.push_front(message);
        self.available.notify_one();
    }

    async fn next(&self, cancel: &CancellationToken) -> Option<BrokerMessage> {
        loop {
            if let Some(message) = self.messages.lock().await.pop_front() {
                return Some(message);
            }
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = self.available.notified() => {}
            }
        }
    }
}

/// In-process broker with the same delivery contract as the NATS backend.
///
/// Each channel is a FIFO queue shared by its subscribers. A subscription
/// holds a single permit, so at most one of its messages is unsettled at a
/// time; a requeued message goes back to the head of the queue.
#[derive(Default, Clone)]
pub struct InMemoryBroker {
    channels: Arc<Mutex<HashMap<String, Arc<ChannelQueue>>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn queue(&self, channel: &str) -> Arc<ChannelQueue> {
        self.channels
            .lock()
            .await
            .entry(channel.to_string())
            .or_default()
            .clone()
    }

    /// Messages waiting for delivery on `channel`, excluding unsettled ones
    pub async fn pending(&self, channel: &str) -> usize {
        self.queue(channel).await.messages.lock().await.len()
    }
}

#[async_trait]
impl BrokerController for InMemoryBroker {
    async fn publish(&self, channel: &str, message: BrokerMessage) -> Result<(), BrokerError> {
        debug!(channel = %channel, payload_size = message.payload.len(), "publishing in-memory message");
        self.queue(channel).await.push_back(message).await;
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        cancel: CancellationToken,
    ) -> Result<BrokerSubscription, BrokerError> {
        let queue = self.queue(channel).await;
        let prefetch = Arc::new(Semaphore::new(1));
        let channel = channel.to_string();

        let subscription = futures::stream::unfold(
            (queue, prefetch, channel, cancel),
            |(queue, prefetch, channel, cancel)| async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    permit = prefetch.clone().acquire_owned() => permit.ok()?,
                };

                let message = queue.next(&cancel).await?;
                let acker = InMemoryAcker {
                    queue: queue.clone(),
                    message: message.clone(),
                    permit: Mutex::new(Some(permit)),
                };
                let delivery = AcknowledgeableMessage::new(&channel, message, Box::new(acker));

                Some((delivery, (queue, prefetch, channel, cancel)))
            },
        );

        Ok(Box::pin(subscription))
    }
}

struct InMemoryAcker {
    queue: Arc<ChannelQueue>,
    message: BrokerMessage,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

#[async_trait]
impl MessageAcker for InMemoryAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.permit.lock().await.take();
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> Result<(), BrokerError> {
        if requeue {
            self.queue.push_front(self.message.clone()).await;
        }
        self.permit.lock().await.take();
        Ok(())
    }
}
