use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connection(String),

    #[error("failed to declare channel {channel}: {reason}")]
    Declare { channel: String, reason: String },

    #[error("failed to publish to {channel}: {reason}")]
    Publish { channel: String, reason: String },

    #[error("failed to subscribe to {channel}: {reason}")]
    Subscribe { channel: String, reason: String },

    #[error("failed to settle message: {0}")]
    Settle(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
