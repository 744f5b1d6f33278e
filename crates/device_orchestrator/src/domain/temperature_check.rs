use crate::domain::HealthCheckTask;
use async_trait::async_trait;
use common::domain::{
    AdapterResult, Device, DeviceRepository, DeviceStatus, DomainError, DomainResult, Telemetry,
    TelemetryRepository, TemperatureClient, TemperatureReading,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Reads a temperature sensor and records the reading.
///
/// A successful read marks the sensor active; sensors have no inactive state
/// of their own.
pub struct TemperatureCheck {
    device_id: Uuid,
    device_repository: Arc<dyn DeviceRepository>,
    telemetry_repository: Arc<dyn TelemetryRepository>,
    temperature_client: Arc<dyn TemperatureClient>,
}

impl TemperatureCheck {
    pub fn new(
        device_id: Uuid,
        device_repository: Arc<dyn DeviceRepository>,
        telemetry_repository: Arc<dyn TelemetryRepository>,
        temperature_client: Arc<dyn TemperatureClient>,
    ) -> Self {
        Self {
            device_id,
            device_repository,
            telemetry_repository,
            temperature_client,
        }
    }

    // location wins; the sensor-id endpoint only serves devices without one
    async fn read(&self, device: &Device) -> AdapterResult<TemperatureReading> {
        match device.sensor_id {
            Some(sensor_id) if device.location.is_empty() => {
                self.temperature_client
                    .get_temperature_by_sensor_id(&device.host, sensor_id)
                    .await
            }
            _ => {
                self.temperature_client
                    .get_temperature(&device.host, &device.location)
                    .await
            }
        }
    }
}

#[async_trait]
impl HealthCheckTask for TemperatureCheck {
    fn device_id(&self) -> Uuid {
        self.device_id
    }

    #[instrument(skip(self), fields(device_id = %self.device_id))]
    async fn run(&self) -> DomainResult<()> {
        let device = self
            .device_repository
            .get_device(self.device_id)
            .await?
            .ok_or(DomainError::DeviceNotFound(self.device_id))?;

        let reading = match self.read(&device).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(host = %device.host, error = %e, "temperature read failed");
                self.device_repository
                    .set_device_status(self.device_id, DeviceStatus::Unknown)
                    .await?;
                return Err(e.into());
            }
        };

        self.device_repository
            .set_device_status(self.device_id, DeviceStatus::Active)
            .await?;

        let data = serde_json::to_value(&reading)
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        self.telemetry_repository
            .add_telemetry(Telemetry::now(self.device_id, data))
            .await?;

        debug!(temperature = reading.temperature, "temperature recorded");
        Ok(())
    }
}
