use crate::domain::{DomainError, DomainResult, Telemetry, TelemetryRepository};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// PostgreSQL implementation of TelemetryRepository over `warmhouse.telemetry`
#[derive(Clone)]
pub struct PostgresTelemetryRepository {
    client: PostgresClient,
}

impl PostgresTelemetryRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TelemetryRepository for PostgresTelemetryRepository {
    #[instrument(skip(self, telemetry), fields(device_id = %telemetry.device_id))]
    async fn add_telemetry(&self, telemetry: Telemetry) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "INSERT INTO warmhouse.telemetry (device_id, timestamp, data) VALUES ($1, $2, $3)",
            &[&telemetry.device_id, &telemetry.timestamp, &telemetry.data],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("recorded telemetry for device: {}", telemetry.device_id);
        Ok(())
    }
}
