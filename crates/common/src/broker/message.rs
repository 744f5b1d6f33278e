use crate::broker::BrokerError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Transport-neutral message: string-keyed binary headers plus an opaque body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerMessage {
    pub headers: HashMap<String, Bytes>,
    pub payload: Bytes,
}

impl BrokerMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            headers: HashMap::new(),
            payload: payload.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Header value as UTF-8, if present and valid
    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.headers
            .get(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// Backend hook that settles one delivered message
#[async_trait]
pub trait MessageAcker: Send + Sync {
    async fn ack(&self) -> Result<(), BrokerError>;

    /// Reject the message; `requeue` asks the broker to redeliver it
    async fn nack(&self, requeue: bool) -> Result<(), BrokerError>;
}

/// A delivered message that must be settled exactly once.
///
/// `ack` and `nack` consume the message. Dropping it unsettled nacks it with
/// requeue on the current runtime.
pub struct AcknowledgeableMessage {
    channel: String,
    message: BrokerMessage,
    acker: Option<Box<dyn MessageAcker>>,
}

impl AcknowledgeableMessage {
    pub fn new(
        channel: impl Into<String>,
        message: BrokerMessage,
        acker: Box<dyn MessageAcker>,
    ) -> Self {
        Self {
            channel: channel.into(),
            message,
            acker: Some(acker),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn message(&self) -> &BrokerMessage {
        &self.message
    }

    pub fn payload(&self) -> &Bytes {
        &self.message.payload
    }

    pub fn headers(&self) -> &HashMap<String, Bytes> {
        &self.message.headers
    }

    pub async fn ack(mut self) -> Result<(), BrokerError> {
        match self.acker.take() {
            Some(acker) => acker.ack().await,
            None => Ok(()),
        }
    }

    pub async fn nack(mut self, requeue: bool) -> Result<(), BrokerError> {
        match self.acker.take() {
            Some(acker) => acker.nack(requeue).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for AcknowledgeableMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcknowledgeableMessage")
            .field("channel", &self.channel)
            .field("payload_bytes", &self.message.payload.len())
            .field("settled", &self.acker.is_none())
            .finish()
    }
}

impl Drop for AcknowledgeableMessage {
    fn drop(&mut self) {
        let Some(acker) = self.acker.take() else {
            return;
        };

        debug!(channel = %self.channel, "unsettled message dropped, requeueing");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let channel = self.channel.clone();
                handle.spawn(async move {
                    if let Err(e) = acker.nack(true).await {
                        warn!(channel = %channel, error = %e, "failed to requeue dropped message");
                    }
                });
            }
            Err(_) => {
                warn!(channel = %self.channel, "no runtime to requeue dropped message");
            }
        }
    }
}
