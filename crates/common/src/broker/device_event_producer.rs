use crate::broker::{inject_trace_context, BrokerController, BrokerError, BrokerMessage};
use crate::domain::{DomainEvent, DomainEventKind};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Channel name per event kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventChannels {
    pub device_created: String,
    pub device_updated: String,
    pub device_deleted: String,
    pub house_deleted: String,
    pub user_deleted: String,
}

impl EventChannels {
    pub fn channel(&self, kind: DomainEventKind) -> &str {
        match kind {
            DomainEventKind::DeviceCreated => &self.device_created,
            DomainEventKind::DeviceUpdated => &self.device_updated,
            DomainEventKind::DeviceDeleted => &self.device_deleted,
            DomainEventKind::HouseDeleted => &self.house_deleted,
            DomainEventKind::UserDeleted => &self.user_deleted,
        }
    }
}

impl Default for EventChannels {
    fn default() -> Self {
        Self {
            device_created: DomainEventKind::DeviceCreated.default_channel().to_string(),
            device_updated: DomainEventKind::DeviceUpdated.default_channel().to_string(),
            device_deleted: DomainEventKind::DeviceDeleted.default_channel().to_string(),
            house_deleted: DomainEventKind::HouseDeleted.default_channel().to_string(),
            user_deleted: DomainEventKind::UserDeleted.default_channel().to_string(),
        }
    }
}

/// Publishes domain events as JSON on their channel, carrying the current
/// trace context in the message headers
pub struct DeviceEventProducer {
    broker: Arc<dyn BrokerController>,
    channels: EventChannels,
}

impl DeviceEventProducer {
    pub fn new(broker: Arc<dyn BrokerController>, channels: EventChannels) -> Self {
        Self { broker, channels }
    }

    #[instrument(skip(self, event), fields(kind = ?event.kind()))]
    pub async fn publish(&self, event: &DomainEvent) -> Result<(), BrokerError> {
        let channel = self.channels.channel(event.kind());
        let mut message = BrokerMessage::new(event.encode()?);
        inject_trace_context(&mut message.headers);

        self.broker.publish(channel, message).await?;
        debug!(channel = %channel, "published domain event");
        Ok(())
    }
}
