use crate::domain::DeviceServices;
use common::domain::{DeviceRepository, DomainResult};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Re-arms health-check jobs after a restart.
///
/// Scheduler state lives only in memory, so every Active or Unknown device
/// gets its job back before any new event is consumed.
pub struct DeviceStarter {
    device_repository: Arc<dyn DeviceRepository>,
    services: DeviceServices,
}

impl DeviceStarter {
    pub fn new(device_repository: Arc<dyn DeviceRepository>, services: DeviceServices) -> Self {
        Self {
            device_repository,
            services,
        }
    }

    /// Returns how many devices were re-armed. One bad device does not stop
    /// the others.
    #[instrument(skip(self))]
    pub async fn start(&self) -> DomainResult<usize> {
        let devices = self.device_repository.get_all_active_devices().await?;
        let total = devices.len();
        let mut armed = 0;

        for device in devices {
            let device_id = device.device_id;
            match self
                .services
                .for_type(device.device_type)
                .rearm_device(device)
                .await
            {
                Ok(()) => armed += 1,
                Err(e) => {
                    error!(device_id = %device_id, error = %e, "failed to re-arm device");
                }
            }
        }

        info!(armed, total, "device health checks re-armed");
        Ok(armed)
    }
}
