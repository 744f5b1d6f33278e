use crate::domain::{Device, DeviceRepository, DeviceStatus, DomainError, DomainResult};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const DEVICE_COLUMNS: &str = "d.id, d.house_id, d.name, d.type, d.host, d.location, d.unit, d.value, \
     d.sensor_id, d.schedule, d.status, d.created_at, d.updated_at";

/// Raw `warmhouse.devices` row; enum columns are stored as text
#[derive(Debug, Clone)]
pub struct DeviceRow {
    pub id: Uuid,
    pub house_id: Uuid,
    pub name: String,
    pub device_type: String,
    pub host: String,
    pub location: String,
    pub unit: String,
    pub value: String,
    pub sensor_id: Option<i64>,
    pub schedule: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Row> for DeviceRow {
    fn from(row: &Row) -> Self {
        DeviceRow {
            id: row.get(0),
            house_id: row.get(1),
            name: row.get(2),
            device_type: row.get(3),
            host: row.get(4),
            location: row.get(5),
            unit: row.get(6),
            value: row.get(7),
            sensor_id: row.get(8),
            schedule: row.get(9),
            status: row.get(10),
            created_at: row.get(11),
            updated_at: row.get(12),
        }
    }
}

impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let corrupt = |column: &str, value: &str| {
            DomainError::RepositoryError(anyhow::anyhow!(
                "device {} has invalid {column} '{value}'",
                row.id
            ))
        };

        Ok(Device {
            device_id: row.id,
            house_id: row.house_id,
            device_type: row
                .device_type
                .parse()
                .map_err(|_| corrupt("type", &row.device_type))?,
            status: row
                .status
                .parse()
                .map_err(|_| corrupt("status", &row.status))?,
            name: row.name,
            host: row.host,
            location: row.location,
            unit: row.unit,
            value: row.value,
            sensor_id: row.sensor_id,
            schedule: row.schedule,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

fn devices_from_rows(rows: &[Row]) -> DomainResult<Vec<Device>> {
    rows.iter()
        .map(|row| Device::try_from(DeviceRow::from(row)))
        .collect()
}

fn repo_err(e: tokio_postgres::Error) -> DomainError {
    DomainError::RepositoryError(e.into())
}

/// PostgreSQL implementation of DeviceRepository
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    async fn query_devices(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn.query(query, params).await.map_err(repo_err)?;
        devices_from_rows(&rows)
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self, device), fields(device_id = %device.device_id, house_id = %device.house_id))]
    async fn create_device(&self, device: Device) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        let result = conn
            .execute(
                "INSERT INTO warmhouse.devices
                    (id, house_id, name, type, host, location, unit, value, sensor_id, schedule, status, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                &[
                    &device.device_id,
                    &device.house_id,
                    &device.name,
                    &device.device_type.as_str(),
                    &device.host,
                    &device.location,
                    &device.unit,
                    &device.value,
                    &device.sensor_id,
                    &device.schedule,
                    &device.status.as_str(),
                    &now,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            // 23505 is unique_violation
            if let Some(db_err) = e.as_db_error() {
                if db_err.code().code() == "23505" {
                    return Err(DomainError::DeviceAlreadyExists(device.device_id));
                }
            }
            return Err(repo_err(e));
        }

        debug!("created device: {}", device.device_id);

        Ok(Device {
            created_at: Some(now),
            updated_at: Some(now),
            ..device
        })
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn get_device(&self, device_id: Uuid) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!("SELECT {DEVICE_COLUMNS} FROM warmhouse.devices d WHERE d.id = $1"),
                &[&device_id],
            )
            .await
            .map_err(repo_err)?;

        row.map(|row| Device::try_from(DeviceRow::from(&row)))
            .transpose()
    }

    #[instrument(skip(self, device), fields(device_id = %device.device_id))]
    async fn update_device(&self, device: Device) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "UPDATE warmhouse.devices
                 SET name = $2, host = $3, location = $4, unit = $5, value = $6,
                     sensor_id = $7, schedule = $8, status = $9, updated_at = NOW()
                 WHERE id = $1
                 RETURNING created_at, updated_at",
                &[
                    &device.device_id,
                    &device.name,
                    &device.host,
                    &device.location,
                    &device.unit,
                    &device.value,
                    &device.sensor_id,
                    &device.schedule,
                    &device.status.as_str(),
                ],
            )
            .await
            .map_err(repo_err)?;

        let row = row.ok_or(DomainError::DeviceNotFound(device.device_id))?;
        debug!("updated device: {}", device.device_id);

        Ok(Device {
            created_at: Some(row.get(0)),
            updated_at: Some(row.get(1)),
            ..device
        })
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn delete_device(&self, device_id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute("DELETE FROM warmhouse.devices WHERE id = $1", &[&device_id])
            .await
            .map_err(repo_err)?;

        debug!(deleted = deleted, "deleted device: {}", device_id);
        Ok(())
    }

    #[instrument(skip(self), fields(house_id = %house_id))]
    async fn get_house_devices(&self, house_id: Uuid) -> DomainResult<Vec<Device>> {
        self.query_devices(
            &format!(
                "SELECT {DEVICE_COLUMNS} FROM warmhouse.devices d WHERE d.house_id = $1 ORDER BY d.created_at"
            ),
            &[&house_id],
        )
        .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_user_devices(&self, user_id: Uuid) -> DomainResult<Vec<Device>> {
        self.query_devices(
            &format!(
                "SELECT {DEVICE_COLUMNS} FROM warmhouse.devices d
                 JOIN warmhouse.houses h ON d.house_id = h.id
                 WHERE h.user_id = $1
                 ORDER BY d.created_at"
            ),
            &[&user_id],
        )
        .await
    }

    #[instrument(skip(self), fields(device_id = %device_id, status = %status))]
    async fn set_device_status(&self, device_id: Uuid, status: DeviceStatus) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = conn
            .execute(
                "UPDATE warmhouse.devices SET status = $2, updated_at = NOW() WHERE id = $1",
                &[&device_id, &status.as_str()],
            )
            .await
            .map_err(repo_err)?;

        if updated == 0 {
            return Err(DomainError::DeviceNotFound(device_id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_all_active_devices(&self) -> DomainResult<Vec<Device>> {
        let devices = self
            .query_devices(
                &format!(
                    "SELECT {DEVICE_COLUMNS} FROM warmhouse.devices d
                     WHERE d.status = 'active' OR d.status = 'unknown'"
                ),
                &[],
            )
            .await?;

        debug!("found {} active devices", devices.len());
        Ok(devices)
    }
}
