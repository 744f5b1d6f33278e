use crate::domain::HealthCheckTask;
use async_trait::async_trait;
use common::domain::{
    DeviceRepository, DeviceStatus, DomainError, DomainResult, GatesClient, Telemetry,
    TelemetryRepository,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Polls a gate controller and records its activity and position
pub struct GatesStatusCheck {
    device_id: Uuid,
    device_repository: Arc<dyn DeviceRepository>,
    telemetry_repository: Arc<dyn TelemetryRepository>,
    gates_client: Arc<dyn GatesClient>,
}

impl GatesStatusCheck {
    pub fn new(
        device_id: Uuid,
        device_repository: Arc<dyn DeviceRepository>,
        telemetry_repository: Arc<dyn TelemetryRepository>,
        gates_client: Arc<dyn GatesClient>,
    ) -> Self {
        Self {
            device_id,
            device_repository,
            telemetry_repository,
            gates_client,
        }
    }
}

#[async_trait]
impl HealthCheckTask for GatesStatusCheck {
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

        let status = match self.gates_client.get_gate_status(&device.host).await {
            Ok(status) => status,
            Err(e) => {
                warn!(host = %device.host, error = %e, "gate status poll failed");
                self.device_repository
                    .set_device_status(self.device_id, DeviceStatus::Unknown)
                    .await?;
                return Err(e.into());
            }
        };

        let device_status = if status.is_active {
            DeviceStatus::Active
        } else {
            DeviceStatus::Inactive
        };
        self.device_repository
            .set_device_status(self.device_id, device_status)
            .await?;

        let data = serde_json::to_value(&status)
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        self.telemetry_repository
            .add_telemetry(Telemetry::now(self.device_id, data))
            .await?;

        debug!(status = %device_status, "gate status recorded");
        Ok(())
    }
}
