use async_trait::async_trait;
use common::domain::{CreateDeviceInput, Device, DeviceType, DomainResult, UpdateDeviceInput};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle operations for one device type.
///
/// Implementations own the persisted row, the physical adapter calls and the
/// device's health-check job. Bulk deletes only touch devices of the
/// implementation's own type.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceLifecycleService: Send + Sync {
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<()>;

    async fn update_device(&self, input: UpdateDeviceInput) -> DomainResult<()>;

    async fn delete_device(&self, device_id: Uuid) -> DomainResult<()>;

    async fn delete_house_devices(&self, house_id: Uuid) -> DomainResult<()>;

    async fn delete_user_devices(&self, user_id: Uuid) -> DomainResult<()>;

    /// Replace any existing health-check job of a persisted device
    async fn rearm_device(&self, device: Device) -> DomainResult<()>;
}

/// One lifecycle service per device type
#[derive(Clone)]
pub struct DeviceServices {
    pub gates: Arc<dyn DeviceLifecycleService>,
    pub warming: Arc<dyn DeviceLifecycleService>,
}

impl DeviceServices {
    pub fn new(
        gates: Arc<dyn DeviceLifecycleService>,
        warming: Arc<dyn DeviceLifecycleService>,
    ) -> Self {
        Self { gates, warming }
    }

    pub fn for_type(&self, device_type: DeviceType) -> &Arc<dyn DeviceLifecycleService> {
        match device_type {
            DeviceType::Gates => &self.gates,
            DeviceType::Temperature => &self.warming,
        }
    }

    /// Gates first, then warming
    pub fn all(&self) -> [&Arc<dyn DeviceLifecycleService>; 2] {
        [&self.gates, &self.warming]
    }
}
