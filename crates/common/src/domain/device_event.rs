use serde::{Deserialize, Serialize};

pub const DEVICE_CREATED_CHANNEL: &str = "device.created";
pub const DEVICE_UPDATED_CHANNEL: &str = "device.updated";
pub const DEVICE_DELETED_CHANNEL: &str = "device.deleted";
pub const HOUSE_DELETED_CHANNEL: &str = "house.deleted";
pub const USER_DELETED_CHANNEL: &str = "user.deleted";

/// Wire payloads carry identifiers and enums as plain strings; the event
/// router is responsible for validating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCreatedPayload {
    pub device_id: String,
    pub house_id: String,
    pub device_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<i64>,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdatedPayload {
    pub device_id: String,
    pub house_id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDeletedPayload {
    pub device_id: String,
    pub house_id: String,
    #[serde(rename = "type")]
    pub device_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseDeletedPayload {
    pub house_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeletedPayload {
    pub user_id: String,
}

/// Closed set of events consumed by the device orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    DeviceCreated(DeviceCreatedPayload),
    DeviceUpdated(DeviceUpdatedPayload),
    DeviceDeleted(DeviceDeletedPayload),
    HouseDeleted(HouseDeletedPayload),
    UserDeleted(UserDeletedPayload),
}

/// Entity an event is about, as carried on the wire (not yet validated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSubject {
    Device(String),
    House(String),
    User(String),
}

impl std::fmt::Display for EventSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSubject::Device(id) => write!(f, "device:{id}"),
            EventSubject::House(id) => write!(f, "house:{id}"),
            EventSubject::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Event kind, one per broker channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainEventKind {
    DeviceCreated,
    DeviceUpdated,
    DeviceDeleted,
    HouseDeleted,
    UserDeleted,
}

impl DomainEventKind {
    pub const ALL: [DomainEventKind; 5] = [
        DomainEventKind::DeviceCreated,
        DomainEventKind::DeviceUpdated,
        DomainEventKind::DeviceDeleted,
        DomainEventKind::HouseDeleted,
        DomainEventKind::UserDeleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainEventKind::DeviceCreated => "device_created",
            DomainEventKind::DeviceUpdated => "device_updated",
            DomainEventKind::DeviceDeleted => "device_deleted",
            DomainEventKind::HouseDeleted => "house_deleted",
            DomainEventKind::UserDeleted => "user_deleted",
        }
    }

    /// Default channel name the event travels on
    pub fn default_channel(&self) -> &'static str {
        match self {
            DomainEventKind::DeviceCreated => DEVICE_CREATED_CHANNEL,
            DomainEventKind::DeviceUpdated => DEVICE_UPDATED_CHANNEL,
            DomainEventKind::DeviceDeleted => DEVICE_DELETED_CHANNEL,
            DomainEventKind::HouseDeleted => HOUSE_DELETED_CHANNEL,
            DomainEventKind::UserDeleted => USER_DELETED_CHANNEL,
        }
    }
}

impl DomainEvent {
    pub fn kind(&self) -> DomainEventKind {
        match self {
            DomainEvent::DeviceCreated(_) => DomainEventKind::DeviceCreated,
            DomainEvent::DeviceUpdated(_) => DomainEventKind::DeviceUpdated,
            DomainEvent::DeviceDeleted(_) => DomainEventKind::DeviceDeleted,
            DomainEvent::HouseDeleted(_) => DomainEventKind::HouseDeleted,
            DomainEvent::UserDeleted(_) => DomainEventKind::UserDeleted,
        }
    }

    pub fn subject(&self) -> EventSubject {
        match self {
            DomainEvent::DeviceCreated(p) => EventSubject::Device(p.device_id.clone()),
            DomainEvent::DeviceUpdated(p) => EventSubject::Device(p.device_id.clone()),
            DomainEvent::DeviceDeleted(p) => EventSubject::Device(p.device_id.clone()),
            DomainEvent::HouseDeleted(p) => EventSubject::House(p.house_id.clone()),
            DomainEvent::UserDeleted(p) => EventSubject::User(p.user_id.clone()),
        }
    }

    /// Decode a JSON message body as the event of the given kind
    pub fn decode(kind: DomainEventKind, payload: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            DomainEventKind::DeviceCreated => {
                DomainEvent::DeviceCreated(serde_json::from_slice(payload)?)
            }
            DomainEventKind::DeviceUpdated => {
                DomainEvent::DeviceUpdated(serde_json::from_slice(payload)?)
            }
            DomainEventKind::DeviceDeleted => {
                DomainEvent::DeviceDeleted(serde_json::from_slice(payload)?)
            }
            DomainEventKind::HouseDeleted => {
                DomainEvent::HouseDeleted(serde_json::from_slice(payload)?)
            }
            DomainEventKind::UserDeleted => {
                DomainEvent::UserDeleted(serde_json::from_slice(payload)?)
            }
        })
    }

    /// Encode the event payload as a JSON message body
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            DomainEvent::DeviceCreated(p) => serde_json::to_vec(p),
            DomainEvent::DeviceUpdated(p) => serde_json::to_vec(p),
            DomainEvent::DeviceDeleted(p) => serde_json::to_vec(p),
            DomainEvent::HouseDeleted(p) => serde_json::to_vec(p),
            DomainEvent::UserDeleted(p) => serde_json::to_vec(p),
        }
    }
}
