use crate::broker::{
    channel_queue_name, AcknowledgeableMessage, BrokerController, BrokerError, BrokerMessage,
    BrokerSubscription, MessageAcker,
};
use async_nats::jetstream::{self, consumer::pull, message::Acker, AckKind};
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct NatsBrokerConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Prefix of the durable consumer name created per channel
    pub consumer_prefix: String,
    /// Redelivery delay applied to requeued messages
    pub nak_delay: Duration,
}

/// JetStream-backed broker: one file-backed work-queue stream per channel and
/// one durable pull consumer per channel with `max_ack_pending = 1`.
pub struct NatsBrokerController {
    jetstream: jetstream::Context,
    consumer_prefix: String,
    nak_delay: Duration,
    declared: Mutex<HashSet<String>>,
}

impl NatsBrokerController {
    pub async fn connect(config: &NatsBrokerConfig) -> Result<Self, BrokerError> {
        info!(url = %config.url, timeout_ms = config.connect_timeout.as_millis(), "Connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(config.connect_timeout)
            .connect(config.url.as_str())
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        info!("Successfully connected to NATS");
        Ok(Self::new(
            jetstream::new(client),
            &config.consumer_prefix,
            config.nak_delay,
        ))
    }

    pub fn new(jetstream: jetstream::Context, consumer_prefix: &str, nak_delay: Duration) -> Self {
        Self {
            jetstream,
            consumer_prefix: consumer_prefix.to_string(),
            nak_delay,
            declared: Mutex::new(HashSet::new()),
        }
    }

    async fn ensure_stream(&self, channel: &str) -> Result<jetstream::stream::Stream, BrokerError> {
        let stream_name = channel_queue_name(channel);
        let config = jetstream::stream::Config {
            name: stream_name.clone(),
            subjects: vec![channel.to_string()],
            description: Some(format!("Durable queue for {channel} events")),
            retention: jetstream::stream::RetentionPolicy::WorkQueue,
            storage: jetstream::stream::StorageType::File,
            ..Default::default()
        };

        let stream = self
            .jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| BrokerError::Declare {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        if self.declared.lock().await.insert(stream_name.clone()) {
            debug!(stream = %stream_name, channel = %channel, "Stream declared");
        }
        Ok(stream)
    }

    fn consumer_name(&self, channel: &str) -> String {
        format!("{}-{}", self.consumer_prefix, channel_queue_name(channel))
    }
}

#[async_trait]
impl BrokerController for NatsBrokerController {
    #[instrument(skip(self, message), fields(channel = %channel, payload_size = message.payload.len()))]
    async fn publish(&self, channel: &str, message: BrokerMessage) -> Result<(), BrokerError> {
        if !self
            .declared
            .lock()
            .await
            .contains(&channel_queue_name(channel))
        {
            self.ensure_stream(channel).await?;
        }

        let publish_err = |reason: String| BrokerError::Publish {
            channel: channel.to_string(),
            reason,
        };

        let ack = self
            .jetstream
            .publish_with_headers(channel.to_string(), to_nats_headers(&message.headers), message.payload)
            .await
            .map_err(|e| publish_err(e.to_string()))?;

        ack.await.map_err(|e| publish_err(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        cancel: CancellationToken,
    ) -> Result<BrokerSubscription, BrokerError> {
        let stream = self.ensure_stream(channel).await?;
        let consumer_name = self.consumer_name(channel);
        let subscribe_err = |reason: String| BrokerError::Subscribe {
            channel: channel.to_string(),
            reason,
        };

        let consumer = stream
            .get_or_create_consumer(
                &consumer_name,
                pull::Config {
                    name: Some(consumer_name.clone()),
                    durable_name: Some(consumer_name.clone()),
                    filter_subject: channel.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    max_ack_pending: 1,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        info!(channel = %channel, consumer = %consumer_name, "Subscribed to channel");

        let channel = channel.to_string();
        let nak_delay = self.nak_delay;
        let subscription = messages
            .take_until(cancel.cancelled_owned())
            .scan((), move |_, delivery| {
                let next = match delivery {
                    Ok(delivery) => Some(into_acknowledgeable(&channel, delivery, nak_delay)),
                    Err(e) => {
                        error!(channel = %channel, error = %e, "Delivery failed, ending subscription");
                        None
                    }
                };
                futures::future::ready(next)
            })
            .boxed();

        Ok(subscription)
    }
}

struct NatsAcker {
    acker: Acker,
    nak_delay: Duration,
}

#[async_trait]
impl MessageAcker for NatsAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.acker
            .ack()
            .await
            .map_err(|e| BrokerError::Settle(e.to_string()))
    }

    async fn nack(&self, requeue: bool) -> Result<(), BrokerError> {
        let kind = if requeue {
            AckKind::Nak(Some(self.nak_delay))
        } else {
            AckKind::Term
        };
        self.acker
            .ack_with(kind)
            .await
            .map_err(|e| BrokerError::Settle(e.to_string()))
    }
}

fn into_acknowledgeable(
    channel: &str,
    delivery: jetstream::Message,
    nak_delay: Duration,
) -> AcknowledgeableMessage {
    let (message, acker) = delivery.split();
    let headers = message
        .headers
        .as_ref()
        .map(from_nats_headers)
        .unwrap_or_default();

    AcknowledgeableMessage::new(
        channel,
        BrokerMessage {
            headers,
            payload: message.payload,
        },
        Box::new(NatsAcker { acker, nak_delay }),
    )
}

fn to_nats_headers(headers: &HashMap<String, Bytes>) -> HeaderMap {
    let mut nats_headers = HeaderMap::new();
    for (key, value) in headers {
        match std::str::from_utf8(value) {
            Ok(value) => {
                nats_headers.insert(key.as_str(), value);
            }
            Err(_) => {
                warn!(header = %key, "Skipping non UTF-8 header");
            }
        }
    }
    nats_headers
}

fn from_nats_headers(headers: &HeaderMap) -> HashMap<String, Bytes> {
    headers
        .iter()
        .filter_map(|(name, values)| {
            values
                .first()
                .map(|v| (name.to_string(), Bytes::copy_from_slice(v.as_str().as_bytes())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_conversion_keeps_utf8_values() {
        let mut headers = HashMap::new();
        headers.insert("traceparent".to_string(), Bytes::from_static(b"00-abc-def-01"));
        headers.insert("binary".to_string(), Bytes::from_static(&[0xff, 0xfe]));

        let nats = to_nats_headers(&headers);
        let back = from_nats_headers(&nats);

        assert_eq!(back.get("traceparent"), Some(&Bytes::from_static(b"00-abc-def-01")));
        assert!(!back.contains_key("binary"));
    }
}
