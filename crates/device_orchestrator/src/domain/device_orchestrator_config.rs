use common::broker::EventChannels;
use common::scheduler::DEFAULT_MAX_CONCURRENT_JOBS;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GATES_SCHEDULE: &str = "*/30 * * * * *";
pub const DEFAULT_TEMPERATURE_SCHEDULE: &str = "0 * * * * *";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOrchestratorConfig {
    /// Cron used for gates devices created without a schedule
    pub default_gates_schedule: String,

    /// Cron used for temperature devices created without a schedule
    pub default_temperature_schedule: String,

    /// Health checks allowed to run at the same time (default: 3)
    pub max_concurrent_jobs: usize,

    #[serde(skip)]
    pub channels: EventChannels,
}

impl Default for DeviceOrchestratorConfig {
    fn default() -> Self {
        Self {
            default_gates_schedule: DEFAULT_GATES_SCHEDULE.to_string(),
            default_temperature_schedule: DEFAULT_TEMPERATURE_SCHEDULE.to_string(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            channels: EventChannels::default(),
        }
    }
}
