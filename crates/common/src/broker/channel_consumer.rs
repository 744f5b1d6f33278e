use crate::broker::{AcknowledgeableMessage, BrokerController, ConsumeRequest, ConsumeResponse};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, error, info, warn};

/// Drives one channel subscription through a Tower service stack.
///
/// Messages are handled strictly one at a time. The service decides the
/// settlement through its `ConsumeResponse`; a service error is treated as a
/// nak. A message still in flight at cancellation is requeued.
pub struct ChannelConsumer<S> {
    broker: Arc<dyn BrokerController>,
    channel: String,
    service: S,
}

impl<S> ChannelConsumer<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error>
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    pub fn new(broker: Arc<dyn BrokerController>, channel: &str, service: S) -> Self {
        Self {
            broker,
            channel: channel.to_string(),
            service,
        }
    }

    /// Consume until cancellation or until the subscription ends
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        debug!(channel = %self.channel, "starting channel consumer");

        let mut subscription = self
            .broker
            .subscribe(&self.channel, ctx.clone())
            .await
            .with_context(|| format!("failed to subscribe to {}", self.channel))?;

        while let Some(delivery) = subscription.next().await {
            self.process(delivery, &ctx).await;
        }

        if ctx.is_cancelled() {
            info!(channel = %self.channel, "received shutdown signal, consumer stopped");
        } else {
            error!(
                channel = %self.channel,
                "subscription ended unexpectedly, consumer needs to be restarted"
            );
        }
        Ok(())
    }

    async fn process(&mut self, delivery: AcknowledgeableMessage, ctx: &CancellationToken) {
        let request = ConsumeRequest::new(
            delivery.channel(),
            delivery.payload().clone(),
            delivery.headers().clone(),
        );

        let outcome = tokio::select! {
            _ = ctx.cancelled() => None,
            result = call_service(&mut self.service, request) => Some(result),
        };

        let settled = match outcome {
            None => {
                warn!(channel = %self.channel, "shutdown while processing, requeueing message");
                delivery.nack(true).await
            }
            Some(Ok(response)) if response.is_ack() => delivery.ack().await,
            Some(Ok(response)) => {
                debug!(
                    channel = %self.channel,
                    reason = response.reason().unwrap_or(""),
                    "requeueing message for redelivery"
                );
                delivery.nack(true).await
            }
            Some(Err(e)) => {
                error!(channel = %self.channel, error = %e, "service error processing message");
                delivery.nack(true).await
            }
        };

        if let Err(e) = settled {
            error!(channel = %self.channel, error = %e, "failed to settle message");
        }
    }
}

async fn call_service<S>(service: &mut S, request: ConsumeRequest) -> Result<ConsumeResponse>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error>,
{
    service.ready().await?.call(request).await
}
