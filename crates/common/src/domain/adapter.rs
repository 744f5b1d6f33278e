use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure talking to a device's HTTP adapter
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("request to {host} failed: {source}")]
    Transport {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} on {host} returned status {status}")]
    UnexpectedStatus {
        host: String,
        operation: &'static str,
        status: u16,
    },

    #[error("invalid response from {host}: {reason}")]
    Decode { host: String, reason: String },
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Physical position reported and accepted by a gate controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Open,
    Closed,
}

impl GateState {
    /// Map a persisted gates value ("opened"/"closed") onto the controller state
    pub fn from_device_value(value: &str) -> Option<Self> {
        match value {
            crate::domain::GATES_VALUE_OPENED => Some(GateState::Open),
            crate::domain::GATES_VALUE_CLOSED => Some(GateState::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub is_active: bool,
    pub state: GateState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temperature: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub sensor_id: String,
}

/// Client for gate actuator controllers addressed by `host`
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GatesClient: Send + Sync {
    async fn activate_gate(&self, host: &str) -> AdapterResult<()>;

    async fn deactivate_gate(&self, host: &str) -> AdapterResult<()>;

    async fn get_gate_status(&self, host: &str) -> AdapterResult<GateStatus>;

    async fn change_gate_state(&self, host: &str, state: GateState) -> AdapterResult<()>;

    async fn health_check(&self, host: &str) -> AdapterResult<()>;
}

/// Client for temperature sensor services addressed by `host`
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TemperatureClient: Send + Sync {
    async fn get_temperature(&self, host: &str, location: &str)
        -> AdapterResult<TemperatureReading>;

    async fn get_temperature_by_sensor_id(
        &self,
        host: &str,
        sensor_id: i64,
    ) -> AdapterResult<TemperatureReading>;

    async fn health_check(&self, host: &str) -> AdapterResult<()>;
}
