use deadpool_postgres::{ManagerConfig, PoolConfig, RecyclingMethod};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const APPLICATION_NAME: &str = "warmhouse-devices";

/// PostgreSQL connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: usize,
}

impl PostgresConfig {
    /// deadpool settings for this database. Connecting and waiting for a
    /// pooled connection both give up after `acquire_timeout`.
    pub fn pool_config(&self, acquire_timeout: Duration) -> deadpool_postgres::Config {
        let mut pool = PoolConfig::new(self.max_pool_size.max(1));
        pool.timeouts.wait = Some(acquire_timeout);
        pool.timeouts.create = Some(acquire_timeout);

        let mut cfg = deadpool_postgres::Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.database.clone());
        cfg.user = Some(self.username.clone());
        cfg.password = Some(self.password.clone());
        cfg.application_name = Some(APPLICATION_NAME.to_string());
        cfg.connect_timeout = Some(acquire_timeout);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(pool);
        cfg
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "warmhouse".to_string(),
            username: "warmhouse".to_string(),
            password: "warmhouse".to_string(),
            max_pool_size: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_carries_connection_settings() {
        let config = PostgresConfig {
            port: 6543,
            max_pool_size: 0,
            ..Default::default()
        };

        let pool = config.pool_config(Duration::from_secs(3));
        assert_eq!(pool.port, Some(6543));
        assert_eq!(pool.dbname.as_deref(), Some("warmhouse"));
        assert_eq!(pool.connect_timeout, Some(Duration::from_secs(3)));

        let limits = pool.pool.unwrap();
        assert_eq!(limits.max_size, 1);
        assert_eq!(limits.timeouts.wait, Some(Duration::from_secs(3)));
    }
}
