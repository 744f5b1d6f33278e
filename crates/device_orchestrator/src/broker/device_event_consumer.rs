use crate::broker::DeviceEventService;
use crate::domain::EventRouter;
use anyhow::Result;
use common::broker::{
    BrokerController, ChannelConsumer, ConsumeLoggingLayer, ConsumeLoggingService,
    ConsumeTracingLayer, ConsumeTracingService,
};
use common::domain::DomainEventKind;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::debug;

/// Type alias for the layered per-channel event service
type DeviceEventLayeredService = ConsumeTracingService<ConsumeLoggingService<DeviceEventService>>;

/// Consumer of one event channel
pub struct DeviceEventConsumer {
    channel: String,
    consumer: ChannelConsumer<DeviceEventLayeredService>,
}

impl DeviceEventConsumer {
    pub fn new(
        broker: Arc<dyn BrokerController>,
        channel: &str,
        kind: DomainEventKind,
        router: EventRouter,
    ) -> Self {
        debug!(channel = %channel, kind = ?kind, "initializing device event consumer");

        let layered_service = ServiceBuilder::new()
            .layer(ConsumeTracingLayer::new())
            .layer(ConsumeLoggingLayer::new())
            .service(DeviceEventService::new(kind, router));

        Self {
            channel: channel.to_string(),
            consumer: ChannelConsumer::new(broker, channel, layered_service),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Run the consume loop until `ctx` is cancelled
    pub async fn run(self, ctx: CancellationToken) -> Result<()> {
        debug!(channel = %self.channel, "starting device event consumer");
        self.consumer.run(ctx).await
    }
}
