use crate::domain::DeviceServices;
use common::domain::{
    CreateDeviceInput, DeviceCreatedPayload, DeviceDeletedPayload, DeviceStatus, DeviceType,
    DeviceUpdatedPayload, DomainError, DomainEvent, DomainResult, HouseDeletedPayload,
    UpdateDeviceInput, UserDeletedPayload,
};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Validates inbound domain events and dispatches them to the lifecycle
/// service of the device's type.
///
/// Events for an unrecognised device type are ignored. House and user
/// deletions cascade to every service in turn and stop at the first failure.
#[derive(Clone)]
pub struct EventRouter {
    services: DeviceServices,
}

impl EventRouter {
    pub fn new(services: DeviceServices) -> Self {
        Self { services }
    }

    pub async fn route(&self, event: DomainEvent) -> DomainResult<()> {
        match event {
            DomainEvent::DeviceCreated(payload) => self.handle_device_created(payload).await,
            DomainEvent::DeviceUpdated(payload) => self.handle_device_updated(payload).await,
            DomainEvent::DeviceDeleted(payload) => self.handle_device_deleted(payload).await,
            DomainEvent::HouseDeleted(payload) => self.handle_house_deleted(payload).await,
            DomainEvent::UserDeleted(payload) => self.handle_user_deleted(payload).await,
        }
    }

    #[instrument(skip(self, payload), fields(device_id = %payload.device_id))]
    pub async fn handle_device_created(&self, payload: DeviceCreatedPayload) -> DomainResult<()> {
        let Some(device_type) = recognised_type(&payload.device_type) else {
            return Ok(());
        };
        let house_id = parse_id("houseId", &payload.house_id)?;
        let device_id = parse_id("deviceId", &payload.device_id)?;
        if let Some(value) = &payload.value {
            device_type.validate_value(value)?;
        }

        let input = CreateDeviceInput {
            device_id,
            house_id,
            device_type,
            name: payload.name,
            host: payload.host,
            location: payload.location,
            value: payload.value,
            sensor_id: payload.sensor_id,
            schedule: payload.schedule,
        };
        self.services.for_type(device_type).create_device(input).await
    }

    #[instrument(skip(self, payload), fields(device_id = %payload.device_id))]
    pub async fn handle_device_updated(&self, payload: DeviceUpdatedPayload) -> DomainResult<()> {
        let Some(device_type) = recognised_type(&payload.device_type) else {
            return Ok(());
        };
        let device_id = parse_id("deviceId", &payload.device_id)?;

        // any invalid field rejects the whole update
        if let Some(host) = &payload.host {
            validate_host(host)?;
        }
        let status = payload
            .status
            .as_deref()
            .map(str::parse::<DeviceStatus>)
            .transpose()?;
        if let Some(value) = &payload.value {
            device_type.validate_value(value)?;
        }

        let input = UpdateDeviceInput {
            device_id,
            name: payload.name,
            unit: payload.unit,
            value: payload.value,
            status,
            location: payload.location,
            host: payload.host,
            sensor_id: payload.sensor_id,
            schedule: payload.schedule,
        };
        self.services.for_type(device_type).update_device(input).await
    }

    #[instrument(skip(self, payload), fields(device_id = %payload.device_id))]
    pub async fn handle_device_deleted(&self, payload: DeviceDeletedPayload) -> DomainResult<()> {
        let Some(device_type) = recognised_type(&payload.device_type) else {
            return Ok(());
        };
        let device_id = parse_id("deviceId", &payload.device_id)?;
        self.services.for_type(device_type).delete_device(device_id).await
    }

    #[instrument(skip(self, payload), fields(house_id = %payload.house_id))]
    pub async fn handle_house_deleted(&self, payload: HouseDeletedPayload) -> DomainResult<()> {
        let house_id = parse_id("houseId", &payload.house_id)?;
        for service in self.services.all() {
            service.delete_house_devices(house_id).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, payload), fields(user_id = %payload.user_id))]
    pub async fn handle_user_deleted(&self, payload: UserDeletedPayload) -> DomainResult<()> {
        let user_id = parse_id("userId", &payload.user_id)?;
        for service in self.services.all() {
            service.delete_user_devices(user_id).await?;
        }
        Ok(())
    }
}

fn parse_id(field: &str, raw: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| DomainError::ValidationError(format!("invalid {field} '{raw}': {e}")))
}

fn recognised_type(raw: &str) -> Option<DeviceType> {
    match raw.parse::<DeviceType>() {
        Ok(device_type) => Some(device_type),
        Err(_) => {
            debug!(device_type = raw, "ignoring event for unsupported device type");
            None
        }
    }
}

/// Hosts are bare `host[:port]` authorities, so they are checked as the
/// authority of an http URL
fn validate_host(host: &str) -> DomainResult<()> {
    let invalid = || DomainError::ValidationError(format!("invalid host '{host}'"));

    if host.is_empty() || host.contains('/') {
        return Err(invalid());
    }
    let url = url::Url::parse(&format!("http://{host}")).map_err(|_| invalid())?;
    match url.host_str() {
        Some(h) if !h.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}
