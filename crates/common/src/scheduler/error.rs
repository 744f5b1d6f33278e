use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("scheduler is stopped")]
    Stopped,
}

impl SchedulerError {
    pub fn is_invalid_expression(&self) -> bool {
        matches!(self, SchedulerError::InvalidCron { .. })
    }
}
