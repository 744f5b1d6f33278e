use common::adapters::DEFAULT_ADAPTER_TIMEOUT;
use common::broker::{EventChannels, NatsBrokerConfig};
use common::postgres::PostgresConfig;
use common::telemetry::{LogFormat, TelemetryConfig};
use config::{Config, ConfigError, Environment};
use device_orchestrator::domain::{
    DeviceOrchestratorConfig, DEFAULT_GATES_SCHEDULE, DEFAULT_TEMPERATURE_SCHEDULE,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Stdout log shape (json, pretty)
    #[serde(default)]
    pub log_format: LogFormat,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    /// OTLP gRPC collector endpoint
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    #[serde(default = "default_nats_connect_timeout_secs")]
    pub nats_connect_timeout_secs: u64,

    /// Prefix of the durable consumer created for each channel
    #[serde(default = "default_nats_consumer_prefix")]
    pub nats_consumer_prefix: String,

    /// Delay before a nacked message is redelivered
    #[serde(default = "default_nats_nak_delay_ms")]
    pub nats_nak_delay_ms: u64,

    // Channel names
    #[serde(default = "default_channel_device_created")]
    pub channel_device_created: String,

    #[serde(default = "default_channel_device_updated")]
    pub channel_device_updated: String,

    #[serde(default = "default_channel_device_deleted")]
    pub channel_device_deleted: String,

    #[serde(default = "default_channel_house_deleted")]
    pub channel_house_deleted: String,

    #[serde(default = "default_channel_user_deleted")]
    pub channel_user_deleted: String,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    // Scheduler and device configuration
    /// Health checks allowed to run at the same time
    #[serde(default = "default_scheduler_max_concurrent_jobs")]
    pub scheduler_max_concurrent_jobs: usize,

    /// Request timeout for calls to device hosts
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,

    #[serde(default = "default_gates_schedule")]
    pub default_gates_schedule: String,

    #[serde(default = "default_temperature_schedule")]
    pub default_temperature_schedule: String,

    /// How long shutdown waits for in-flight health checks
    #[serde(default = "default_shutdown_deadline_secs")]
    pub shutdown_deadline_secs: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

// OpenTelemetry defaults
fn default_otel_enabled() -> bool {
    false
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "warmhouse-devices".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_connect_timeout_secs() -> u64 {
    10
}

fn default_nats_consumer_prefix() -> String {
    "warmhouse-devices".to_string()
}

fn default_nats_nak_delay_ms() -> u64 {
    1000
}

fn default_channel_device_created() -> String {
    "device.created".to_string()
}

fn default_channel_device_updated() -> String {
    "device.updated".to_string()
}

fn default_channel_device_deleted() -> String {
    "device.deleted".to_string()
}

fn default_channel_house_deleted() -> String {
    "house.deleted".to_string()
}

fn default_channel_user_deleted() -> String {
    "user.deleted".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "warmhouse".to_string()
}

fn default_postgres_username() -> String {
    "warmhouse".to_string()
}

fn default_postgres_password() -> String {
    "warmhouse".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

fn default_scheduler_max_concurrent_jobs() -> usize {
    3
}

fn default_adapter_timeout_secs() -> u64 {
    DEFAULT_ADAPTER_TIMEOUT.as_secs()
}

fn default_gates_schedule() -> String {
    DEFAULT_GATES_SCHEDULE.to_string()
}

fn default_temperature_schedule() -> String {
    DEFAULT_TEMPERATURE_SCHEDULE.to_string()
}

fn default_shutdown_deadline_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("WARMHOUSE"))
            .build()?
            .try_deserialize()
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
        }
    }

    pub fn nats_config(&self) -> NatsBrokerConfig {
        NatsBrokerConfig {
            url: self.nats_url.clone(),
            connect_timeout: Duration::from_secs(self.nats_connect_timeout_secs),
            consumer_prefix: self.nats_consumer_prefix.clone(),
            nak_delay: Duration::from_millis(self.nats_nak_delay_ms),
        }
    }

    pub fn channels(&self) -> EventChannels {
        EventChannels {
            device_created: self.channel_device_created.clone(),
            device_updated: self.channel_device_updated.clone(),
            device_deleted: self.channel_device_deleted.clone(),
            house_deleted: self.channel_house_deleted.clone(),
            user_deleted: self.channel_user_deleted.clone(),
        }
    }

    pub fn orchestrator_config(&self) -> DeviceOrchestratorConfig {
        DeviceOrchestratorConfig {
            default_gates_schedule: self.default_gates_schedule.clone(),
            default_temperature_schedule: self.default_temperature_schedule.clone(),
            max_concurrent_jobs: self.scheduler_max_concurrent_jobs,
            channels: self.channels(),
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown_deadline_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}
