use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One recorded health-check reading. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub device_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Telemetry {
    pub fn now(device_id: Uuid, data: serde_json::Value) -> Self {
        Self {
            device_id,
            timestamp: Utc::now(),
            data,
        }
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    async fn add_telemetry(&self, telemetry: Telemetry) -> DomainResult<()>;
}
