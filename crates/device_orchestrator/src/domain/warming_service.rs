use crate::domain::{
    arm_health_check, DeviceLifecycleService, HealthCheckTask, ReschedulePlan, TemperatureCheck,
};
use async_trait::async_trait;
use common::domain::{
    CreateDeviceInput, Device, DeviceRepository, DeviceType, DomainError, DomainResult,
    TelemetryRepository, TemperatureClient, UpdateDeviceInput,
};
use common::scheduler::{CronSchedule, JobScheduler};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Lifecycle of temperature sensors. Sensors are passive, so no lifecycle
/// operation calls the adapter; only the health check reads from it.
pub struct WarmingService {
    device_repository: Arc<dyn DeviceRepository>,
    telemetry_repository: Arc<dyn TelemetryRepository>,
    temperature_client: Arc<dyn TemperatureClient>,
    scheduler: Arc<JobScheduler>,
    default_schedule: String,
}

impl WarmingService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        telemetry_repository: Arc<dyn TelemetryRepository>,
        temperature_client: Arc<dyn TemperatureClient>,
        scheduler: Arc<JobScheduler>,
        default_schedule: impl Into<String>,
    ) -> Self {
        Self {
            device_repository,
            telemetry_repository,
            temperature_client,
            scheduler,
            default_schedule: default_schedule.into(),
        }
    }

    fn health_check(&self, device_id: Uuid) -> Arc<dyn HealthCheckTask> {
        Arc::new(TemperatureCheck::new(
            device_id,
            Arc::clone(&self.device_repository),
            Arc::clone(&self.telemetry_repository),
            Arc::clone(&self.temperature_client),
        ))
    }

    async fn load_sensor(&self, device_id: Uuid) -> DomainResult<Option<Device>> {
        match self.device_repository.get_device(device_id).await? {
            Some(device) if device.device_type != DeviceType::Temperature => {
                Err(DomainError::ValidationError(format!(
                    "device {device_id} is a {} device, not temperature",
                    device.device_type
                )))
            }
            other => Ok(other),
        }
    }

    async fn delete_sensors(&self, devices: Vec<Device>) -> DomainResult<()> {
        for device in devices
            .into_iter()
            .filter(|d| d.device_type == DeviceType::Temperature)
        {
            self.delete_device(device.device_id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceLifecycleService for WarmingService {
    #[instrument(skip(self, input), fields(device_id = %input.device_id, house_id = %input.house_id))]
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<()> {
        let device = Device::from_create_input(input, &self.default_schedule);
        let schedule = CronSchedule::parse(&device.schedule)?;
        let device_id = device.device_id;

        match self.device_repository.create_device(device).await {
            Ok(_) => {}
            Err(DomainError::DeviceAlreadyExists(_)) => {
                let Some(existing) = self.load_sensor(device_id).await? else {
                    return Err(DomainError::DeviceNotFound(device_id));
                };
                debug!("temperature device already exists, re-arming");
                return self.rearm_device(existing).await;
            }
            Err(e) => return Err(e),
        }

        arm_health_check(&self.scheduler, &schedule, self.health_check(device_id)).await?;
        info!("temperature device created");
        Ok(())
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<()> {
        let mut device = self
            .load_sensor(input.device_id)
            .await?
            .ok_or(DomainError::DeviceNotFound(input.device_id))?;
        let device_id = device.device_id;

        let changes = device.apply_update(&input);
        let schedule = CronSchedule::parse(&device.schedule)?;

        let plan = ReschedulePlan::from_changes(device.device_type, &changes);
        match plan {
            ReschedulePlan::Reschedule => {
                arm_health_check(&self.scheduler, &schedule, self.health_check(device_id))
                    .await?
            }
            ReschedulePlan::UnscheduleOnly => self.scheduler.remove_job(device_id).await,
            ReschedulePlan::Noop => {}
        }

        match self.device_repository.update_device(device).await {
            Ok(_) => {
                debug!(plan = ?plan, "temperature device updated");
                Ok(())
            }
            Err(DomainError::DeviceNotFound(id)) => {
                warn!("temperature device deleted during update, dropping its job");
                self.scheduler.remove_job(device_id).await;
                Err(DomainError::DeviceNotFound(id))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn delete_device(&self, device_id: Uuid) -> DomainResult<()> {
        if self.load_sensor(device_id).await?.is_none() {
            self.scheduler.remove_job(device_id).await;
            return Err(DomainError::DeviceNotFound(device_id));
        }

        // unschedule only once the row is gone; an update racing this call
        // either re-armed before here or drops its job on DeviceNotFound
        self.device_repository.delete_device(device_id).await?;
        self.scheduler.remove_job(device_id).await;

        info!("temperature device deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(house_id = %house_id))]
    async fn delete_house_devices(&self, house_id: Uuid) -> DomainResult<()> {
        let devices = self.device_repository.get_house_devices(house_id).await?;
        self.delete_sensors(devices).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn delete_user_devices(&self, user_id: Uuid) -> DomainResult<()> {
        let devices = self.device_repository.get_user_devices(user_id).await?;
        self.delete_sensors(devices).await
    }

    #[instrument(skip(self, device), fields(device_id = %device.device_id))]
    async fn rearm_device(&self, device: Device) -> DomainResult<()> {
        let schedule = CronSchedule::parse(&device.schedule)?;
        arm_health_check(&self.scheduler, &schedule, self.health_check(device.device_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{
        DeviceStatus, MockDeviceRepository, MockTelemetryRepository, MockTemperatureClient,
    };
    use std::time::Duration;

    const SCHEDULE: &str = "0 * * * * *";

    fn sensor(device_id: Uuid) -> Device {
        Device::from_create_input(
            CreateDeviceInput {
                device_id,
                house_id: Uuid::new_v4(),
                device_type: DeviceType::Temperature,
                name: "Bedroom".to_string(),
                host: "temperature-api:8081".to_string(),
                location: Some("Bedroom".to_string()),
                value: None,
                sensor_id: None,
                schedule: None,
            },
            SCHEDULE,
        )
    }

    fn service(devices: MockDeviceRepository, scheduler: Arc<JobScheduler>) -> WarmingService {
        let mut client = MockTemperatureClient::new();
        client.expect_get_temperature().never();
        client.expect_get_temperature_by_sensor_id().never();

        WarmingService::new(
            Arc::new(devices),
            Arc::new(MockTelemetryRepository::new()),
            Arc::new(client),
            scheduler,
            SCHEDULE,
        )
    }

    async fn armed_scheduler(device_id: Uuid) -> Arc<JobScheduler> {
        let scheduler = Arc::new(JobScheduler::new(3));
        scheduler
            .add_job(&CronSchedule::parse(SCHEDULE).unwrap(), device_id, || async {
                Ok(())
            })
            .await
            .unwrap();
        scheduler
    }

    #[tokio::test]
    async fn test_create_defaults_value_and_schedules() {
        let device_id = Uuid::new_v4();
        let scheduler = Arc::new(JobScheduler::new(3));

        let mut devices = MockDeviceRepository::new();
        devices
            .expect_create_device()
            .withf(|d| d.value == "-" && d.unit == "°C" && d.schedule == SCHEDULE)
            .times(1)
            .returning(Ok);

        let svc = service(devices, scheduler.clone());
        svc.create_device(CreateDeviceInput {
            device_id,
            house_id: Uuid::new_v4(),
            device_type: DeviceType::Temperature,
            name: "Kitchen".to_string(),
            host: "temperature-api:8081".to_string(),
            location: Some("Kitchen".to_string()),
            value: None,
            sensor_id: None,
            schedule: None,
        })
        .await
        .unwrap();

        assert_eq!(scheduler.job_count(device_id).await, 1);
        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_duplicate_create_rearms_without_second_job() {
        let device_id = Uuid::new_v4();
        let scheduler = armed_scheduler(device_id).await;

        let mut devices = MockDeviceRepository::new();
        devices
            .expect_create_device()
            .returning(|d| Err(DomainError::DeviceAlreadyExists(d.device_id)));
        devices
            .expect_get_device()
            .returning(|id| Ok(Some(sensor(id))));

        let svc = service(devices, scheduler.clone());
        let input = CreateDeviceInput {
            device_id,
            house_id: Uuid::new_v4(),
            device_type: DeviceType::Temperature,
            name: "Kitchen".to_string(),
            host: "temperature-api:8081".to_string(),
            location: None,
            value: None,
            sensor_id: None,
            schedule: None,
        };
        svc.create_device(input).await.unwrap();

        assert_eq!(scheduler.job_count(device_id).await, 1);
        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_inactive_sensor_stays_armed() {
        let device_id = Uuid::new_v4();
        let scheduler = armed_scheduler(device_id).await;

        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|id| {
            let mut device = sensor(id);
            device.status = DeviceStatus::Active;
            Ok(Some(device))
        });
        devices
            .expect_update_device()
            .withf(|d| d.status == DeviceStatus::Inactive)
            .times(1)
            .returning(Ok);

        let svc = service(devices, scheduler.clone());
        svc.update_device(UpdateDeviceInput {
            device_id,
            status: Some(DeviceStatus::Inactive),
            ..Default::default()
        })
        .await
        .unwrap();

        // passive sensors keep being polled; the next read flips them back
        assert_eq!(scheduler.job_count(device_id).await, 1);
        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_schedule_change_replaces_job() {
        let device_id = Uuid::new_v4();
        let scheduler = armed_scheduler(device_id).await;

        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|id| Ok(Some(sensor(id))));
        devices.expect_update_device().times(1).returning(Ok);

        let svc = service(devices, scheduler.clone());
        svc.update_device(UpdateDeviceInput {
            device_id,
            schedule: Some("*/10 * * * * *".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(
            scheduler.schedules(device_id).await,
            vec!["*/10 * * * * *".to_string()]
        );
        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_name_only_update_keeps_job() {
        let device_id = Uuid::new_v4();
        let scheduler = armed_scheduler(device_id).await;

        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|id| Ok(Some(sensor(id))));
        devices
            .expect_update_device()
            .withf(|d| d.name == "Nursery")
            .times(1)
            .returning(Ok);

        let svc = service(devices, scheduler.clone());
        svc.update_device(UpdateDeviceInput {
            device_id,
            name: Some("Nursery".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(scheduler.job_count(device_id).await, 1);
        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_job() {
        let device_id = Uuid::new_v4();
        let scheduler = armed_scheduler(device_id).await;

        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|id| Ok(Some(sensor(id))));
        devices.expect_delete_device().times(1).returning(|_| Ok(()));

        let svc = service(devices, scheduler.clone());
        svc.delete_device(device_id).await.unwrap();

        assert!(!scheduler.has_job(device_id).await);
    }

    #[tokio::test]
    async fn test_failed_row_delete_keeps_job() {
        let device_id = Uuid::new_v4();
        let scheduler = armed_scheduler(device_id).await;

        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|id| Ok(Some(sensor(id))));
        devices
            .expect_delete_device()
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("pool closed"))));

        let svc = service(devices, scheduler.clone());
        let err = svc.delete_device(device_id).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(scheduler.has_job(device_id).await);
        scheduler.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_delete_missing_device_is_not_found() {
        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|_| Ok(None));
        devices.expect_delete_device().never();

        let svc = service(devices, Arc::new(JobScheduler::new(3)));
        let err = svc.delete_device(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DomainError::DeviceNotFound(_)));
        assert!(!err.is_retryable());
    }
}
