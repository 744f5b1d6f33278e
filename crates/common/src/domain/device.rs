use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const GATES_VALUE_OPENED: &str = "opened";
pub const GATES_VALUE_CLOSED: &str = "closed";

pub const GATES_UNIT: &str = "-";
pub const TEMPERATURE_UNIT: &str = "°C";

/// Kind of physical device behind a `Device` row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Gates,
    Temperature,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Gates => "gates",
            DeviceType::Temperature => "temperature",
        }
    }

    /// Unit stored for newly created devices of this type
    pub fn unit(&self) -> &'static str {
        match self {
            DeviceType::Gates => GATES_UNIT,
            DeviceType::Temperature => TEMPERATURE_UNIT,
        }
    }

    /// Value stored when a create event carries none
    pub fn default_value(&self) -> &'static str {
        match self {
            DeviceType::Gates => GATES_VALUE_CLOSED,
            DeviceType::Temperature => "-",
        }
    }

    /// Check a value against the type's enumeration.
    /// Gates only accept "opened"/"closed"; other types take any string.
    pub fn validate_value(&self, value: &str) -> DomainResult<()> {
        match self {
            DeviceType::Gates if value != GATES_VALUE_OPENED && value != GATES_VALUE_CLOSED => {
                Err(DomainError::ValidationError(format!(
                    "invalid value for gates device: {value}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gates" => Ok(DeviceType::Gates),
            "temperature" => Ok(DeviceType::Temperature),
            other => Err(DomainError::ValidationError(format!(
                "unknown device type: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a device.
///
/// Unknown moves to Active or Inactive, Active and Inactive flip between
/// each other, and any status drops back to Unknown when the adapter fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Unknown,
    Active,
    Inactive,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 3] = [
        DeviceStatus::Inactive,
        DeviceStatus::Active,
        DeviceStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Unknown => "unknown",
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::ValidationError(format!("invalid status: {s}")))
    }
}

/// Device entity as persisted by the device store
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub device_id: Uuid,
    pub house_id: Uuid,
    pub name: String,
    pub device_type: DeviceType,
    pub host: String,
    pub location: String,
    pub unit: String,
    pub value: String,
    pub sensor_id: Option<i64>,
    pub schedule: String,
    pub status: DeviceStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    /// Build a fresh device with Status=Unknown and type defaults applied
    pub fn from_create_input(input: CreateDeviceInput, default_schedule: &str) -> Self {
        let device_type = input.device_type;
        Self {
            device_id: input.device_id,
            house_id: input.house_id,
            name: input.name,
            device_type,
            host: input.host,
            location: input.location.unwrap_or_default(),
            unit: device_type.unit().to_string(),
            value: input
                .value
                .unwrap_or_else(|| device_type.default_value().to_string()),
            sensor_id: input.sensor_id,
            schedule: input
                .schedule
                .unwrap_or_else(|| default_schedule.to_string()),
            status: DeviceStatus::Unknown,
            created_at: None,
            updated_at: None,
        }
    }

    /// Merge-patch the present fields of `input` into this device and report
    /// which of them actually changed value.
    pub fn apply_update(&mut self, input: &UpdateDeviceInput) -> DeviceChanges {
        let mut changes = DeviceChanges::default();

        if let Some(name) = &input.name {
            self.name = name.clone();
        }
        if let Some(unit) = &input.unit {
            self.unit = unit.clone();
        }
        if let Some(location) = &input.location {
            self.location = location.clone();
        }
        if let Some(host) = &input.host {
            self.host = host.clone();
        }
        if input.sensor_id.is_some() {
            self.sensor_id = input.sensor_id;
        }
        if let Some(value) = &input.value {
            if *value != self.value {
                changes.value = Some(value.clone());
                self.value = value.clone();
            }
        }
        if let Some(status) = input.status {
            if status != self.status {
                changes.status = Some(status);
                self.status = status;
            }
        }
        if let Some(schedule) = &input.schedule {
            if *schedule != self.schedule {
                changes.schedule = Some(schedule.clone());
                self.schedule = schedule.clone();
            }
        }

        changes
    }
}

/// Transitions produced by a merge-patch; `None` means unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceChanges {
    pub status: Option<DeviceStatus>,
    pub value: Option<String>,
    pub schedule: Option<String>,
}

impl DeviceChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.value.is_none() && self.schedule.is_none()
    }
}

/// Validated input for creating a device
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDeviceInput {
    pub device_id: Uuid,
    pub house_id: Uuid,
    pub device_type: DeviceType,
    pub name: String,
    pub host: String,
    pub location: Option<String>,
    pub value: Option<String>,
    pub sensor_id: Option<i64>,
    pub schedule: Option<String>,
}

/// Validated merge-patch for an existing device; absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDeviceInput {
    pub device_id: Uuid,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub value: Option<String>,
    pub status: Option<DeviceStatus>,
    pub location: Option<String>,
    pub host: Option<String>,
    pub sensor_id: Option<i64>,
    pub schedule: Option<String>,
}

/// Repository trait for device persistence operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Insert a new device row
    async fn create_device(&self, device: Device) -> DomainResult<Device>;

    /// Get a device by ID
    async fn get_device(&self, device_id: Uuid) -> DomainResult<Option<Device>>;

    /// Overwrite the mutable fields of an existing device
    async fn update_device(&self, device: Device) -> DomainResult<Device>;

    /// Delete a device row; deleting a missing row is a no-op
    async fn delete_device(&self, device_id: Uuid) -> DomainResult<()>;

    /// List all devices in a house
    async fn get_house_devices(&self, house_id: Uuid) -> DomainResult<Vec<Device>>;

    /// List all devices in houses owned by a user
    async fn get_user_devices(&self, user_id: Uuid) -> DomainResult<Vec<Device>>;

    /// Set only the status column of a device
    async fn set_device_status(&self, device_id: Uuid, status: DeviceStatus) -> DomainResult<()>;

    /// List devices whose status is Active or Unknown
    async fn get_all_active_devices(&self) -> DomainResult<Vec<Device>>;
}
