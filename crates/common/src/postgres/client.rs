use crate::postgres::PostgresConfig;
use anyhow::{Context, Result};
use deadpool_postgres::{Pool, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Default bound on connecting and on waiting for a pooled connection
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pooled connection handle shared by the device and telemetry repositories
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Build the pool; no connection is opened until first use
    pub fn new(config: &PostgresConfig) -> Result<Self> {
        Self::with_acquire_timeout(config, DEFAULT_ACQUIRE_TIMEOUT)
    }

    pub fn with_acquire_timeout(config: &PostgresConfig, timeout: Duration) -> Result<Self> {
        let pool = config
            .pool_config(timeout)
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .with_context(|| {
                format!(
                    "invalid postgres pool config for {}:{}/{}",
                    config.host, config.port, config.database
                )
            })?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_pool_size = config.max_pool_size,
            "postgres pool created"
        );
        Ok(Self { pool })
    }

    /// Round-trip a trivial query to prove the database is reachable
    pub async fn ping(&self) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute("SELECT 1", &[])
            .await
            .context("postgres ping failed")?;
        debug!(pool_size = self.pool.status().size, "postgres reachable");
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .context("failed to check out a postgres connection")
    }
}
