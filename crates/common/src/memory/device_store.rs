use crate::domain::{
    Device, DeviceRepository, DeviceStatus, DomainError, DomainResult, Telemetry,
    TelemetryRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    devices: HashMap<Uuid, Device>,
    house_owners: HashMap<Uuid, Uuid>,
    telemetry: Vec<Telemetry>,
}

/// Process-local device and telemetry store with the same semantics as the
/// PostgreSQL repositories. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryDeviceStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `house_id` belongs to `user_id`
    pub async fn add_house(&self, house_id: Uuid, user_id: Uuid) {
        self.state.write().await.house_owners.insert(house_id, user_id);
    }

    pub async fn device_count(&self) -> usize {
        self.state.read().await.devices.len()
    }

    pub async fn telemetry_for(&self, device_id: Uuid) -> Vec<Telemetry> {
        self.state
            .read()
            .await
            .telemetry
            .iter()
            .filter(|t| t.device_id == device_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceStore {
    async fn create_device(&self, device: Device) -> DomainResult<Device> {
        let mut state = self.state.write().await;
        if state.devices.contains_key(&device.device_id) {
            return Err(DomainError::DeviceAlreadyExists(device.device_id));
        }

        let now = Utc::now();
        let device = Device {
            created_at: Some(now),
            updated_at: Some(now),
            ..device
        };
        state.devices.insert(device.device_id, device.clone());
        Ok(device)
    }

    async fn get_device(&self, device_id: Uuid) -> DomainResult<Option<Device>> {
        Ok(self.state.read().await.devices.get(&device_id).cloned())
    }

    async fn update_device(&self, device: Device) -> DomainResult<Device> {
        let mut state = self.state.write().await;
        let existing = state
            .devices
            .get_mut(&device.device_id)
            .ok_or(DomainError::DeviceNotFound(device.device_id))?;

        // id, house and type are immutable once created
        let updated = Device {
            house_id: existing.house_id,
            device_type: existing.device_type,
            created_at: existing.created_at,
            updated_at: Some(Utc::now()),
            ..device
        };
        *existing = updated.clone();
        Ok(updated)
    }

    async fn delete_device(&self, device_id: Uuid) -> DomainResult<()> {
        self.state.write().await.devices.remove(&device_id);
        Ok(())
    }

    async fn get_house_devices(&self, house_id: Uuid) -> DomainResult<Vec<Device>> {
        let state = self.state.read().await;
        let mut devices: Vec<Device> = state
            .devices
            .values()
            .filter(|d| d.house_id == house_id)
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.created_at);
        Ok(devices)
    }

    async fn get_user_devices(&self, user_id: Uuid) -> DomainResult<Vec<Device>> {
        let state = self.state.read().await;
        let mut devices: Vec<Device> = state
            .devices
            .values()
            .filter(|d| state.house_owners.get(&d.house_id) == Some(&user_id))
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.created_at);
        Ok(devices)
    }

    async fn set_device_status(&self, device_id: Uuid, status: DeviceStatus) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let device = state
            .devices
            .get_mut(&device_id)
            .ok_or(DomainError::DeviceNotFound(device_id))?;

        device.status = status;
        device.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn get_all_active_devices(&self) -> DomainResult<Vec<Device>> {
        Ok(self
            .state
            .read()
            .await
            .devices
            .values()
            .filter(|d| matches!(d.status, DeviceStatus::Active | DeviceStatus::Unknown))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TelemetryRepository for InMemoryDeviceStore {
    async fn add_telemetry(&self, telemetry: Telemetry) -> DomainResult<()> {
        self.state.write().await.telemetry.push(telemetry);
        Ok(())
    }
}
