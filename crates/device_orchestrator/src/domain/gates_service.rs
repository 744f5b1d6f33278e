use crate::domain::{
    arm_health_check, DeviceLifecycleService, GatesStatusCheck, HealthCheckTask, ReschedulePlan,
};
use async_trait::async_trait;
use common::domain::{
    CreateDeviceInput, Device, DeviceRepository, DeviceStatus, DeviceType, DomainError,
    DomainResult, GateState, GatesClient, TelemetryRepository, UpdateDeviceInput,
};
use common::scheduler::{CronSchedule, JobScheduler};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Lifecycle of gate actuators.
///
/// Status transitions drive the controller (activate/deactivate), value
/// transitions move the gate, and the health-check job follows the
/// [`ReschedulePlan`] of each update.
pub struct GatesService {
    device_repository: Arc<dyn DeviceRepository>,
    telemetry_repository: Arc<dyn TelemetryRepository>,
    gates_client: Arc<dyn GatesClient>,
    scheduler: Arc<JobScheduler>,
    default_schedule: String,
}

impl GatesService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        telemetry_repository: Arc<dyn TelemetryRepository>,
        gates_client: Arc<dyn GatesClient>,
        scheduler: Arc<JobScheduler>,
        default_schedule: impl Into<String>,
    ) -> Self {
        Self {
            device_repository,
            telemetry_repository,
            gates_client,
            scheduler,
            default_schedule: default_schedule.into(),
        }
    }

    fn health_check(&self, device_id: Uuid) -> Arc<dyn HealthCheckTask> {
        Arc::new(GatesStatusCheck::new(
            device_id,
            Arc::clone(&self.device_repository),
            Arc::clone(&self.telemetry_repository),
            Arc::clone(&self.gates_client),
        ))
    }

    async fn arm(&self, device_id: Uuid, schedule: &CronSchedule) -> DomainResult<()> {
        arm_health_check(&self.scheduler, schedule, self.health_check(device_id)).await
    }

    async fn load_gate(&self, device_id: Uuid) -> DomainResult<Option<Device>> {
        let device = self.device_repository.get_device(device_id).await?;
        match device {
            Some(device) if device.device_type != DeviceType::Gates => {
                Err(DomainError::ValidationError(format!(
                    "device {device_id} is a {} device, not gates",
                    device.device_type
                )))
            }
            other => Ok(other),
        }
    }

    async fn delete_gates(&self, devices: Vec<Device>) -> DomainResult<()> {
        for device in devices
            .into_iter()
            .filter(|d| d.device_type == DeviceType::Gates)
        {
            self.delete_device(device.device_id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceLifecycleService for GatesService {
    #[instrument(skip(self, input), fields(device_id = %input.device_id, house_id = %input.house_id))]
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<()> {
        let device = Device::from_create_input(input, &self.default_schedule);
        let schedule = CronSchedule::parse(&device.schedule)?;
        let device_id = device.device_id;

        match self.device_repository.create_device(device).await {
            Ok(_) => {
                self.arm(device_id, &schedule).await?;
                info!("gates device created");
                Ok(())
            }
            Err(DomainError::DeviceAlreadyExists(_)) => {
                // redelivered create: keep the stored row, re-arm its schedule
                let Some(existing) = self.load_gate(device_id).await? else {
                    return Err(DomainError::DeviceNotFound(device_id));
                };
                debug!("gates device already exists, re-arming");
                self.rearm_device(existing).await
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<()> {
        let mut device = self
            .load_gate(input.device_id)
            .await?
            .ok_or(DomainError::DeviceNotFound(input.device_id))?;

        let changes = device.apply_update(&input);

        // reject bad input before touching the controller
        let schedule = CronSchedule::parse(&device.schedule)?;
        let gate_state = changes
            .value
            .as_deref()
            .map(|value| {
                GateState::from_device_value(value).ok_or_else(|| {
                    DomainError::ValidationError(format!("invalid gates value: {value}"))
                })
            })
            .transpose()?;
        let plan = ReschedulePlan::from_changes(device.device_type, &changes);

        match changes.status {
            Some(DeviceStatus::Active) => self.gates_client.activate_gate(&device.host).await?,
            Some(DeviceStatus::Inactive) => {
                self.gates_client.deactivate_gate(&device.host).await?
            }
            _ => {}
        }

        if let Some(state) = gate_state {
            self.gates_client.change_gate_state(&device.host, state).await?;
        }

        match plan {
            ReschedulePlan::Reschedule => self.arm(device.device_id, &schedule).await?,
            ReschedulePlan::UnscheduleOnly => self.scheduler.remove_job(device.device_id).await,
            ReschedulePlan::Noop => {}
        }

        let device_id = device.device_id;
        match self.device_repository.update_device(device).await {
            Ok(_) => {
                debug!(plan = ?plan, "gates device updated");
                Ok(())
            }
            Err(DomainError::DeviceNotFound(id)) => {
                // deleted concurrently; do not leave a job behind for the gone row
                warn!("gates device deleted during update, dropping its job");
                self.scheduler.remove_job(device_id).await;
                Err(DomainError::DeviceNotFound(id))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn delete_device(&self, device_id: Uuid) -> DomainResult<()> {
        let Some(device) = self.load_gate(device_id).await? else {
            self.scheduler.remove_job(device_id).await;
            return Err(DomainError::DeviceNotFound(device_id));
        };

        // a failed deactivation leaves both the row and the job in place
        self.gates_client.deactivate_gate(&device.host).await?;

        // row first, then the job; a racing update that re-armed is either
        // cleared here or drops its own job on DeviceNotFound
        self.device_repository.delete_device(device_id).await?;
        self.scheduler.remove_job(device_id).await;

        info!("gates device deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(house_id = %house_id))]
    async fn delete_house_devices(&self, house_id: Uuid) -> DomainResult<()> {
        let devices = self.device_repository.get_house_devices(house_id).await?;
        self.delete_gates(devices).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn delete_user_devices(&self, user_id: Uuid) -> DomainResult<()> {
        let devices = self.device_repository.get_user_devices(user_id).await?;
        self.delete_gates(devices).await
    }

    #[instrument(skip(self, device), fields(device_id = %device.device_id))]
    async fn rearm_device(&self, device: Device) -> DomainResult<()> {
        let schedule = CronSchedule::parse(&device.schedule)?;
        self.arm(device.device_id, &schedule).await
    }
}
