use crate::domain::AdapterError;
use crate::scheduler::SchedulerError;
use thiserror::Error;
use uuid::Uuid;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(Uuid),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(Uuid),

    #[error("Device adapter error: {0}")]
    AdapterError(#[from] AdapterError),

    #[error("Scheduler error: {0}")]
    SchedulerError(#[from] SchedulerError),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    /// Whether redelivering the triggering message can succeed later.
    ///
    /// Malformed payloads, missing devices and bad cron expressions fail the
    /// same way on every attempt; adapter and storage failures may not.
    pub fn is_retryable(&self) -> bool {
        match self {
            DomainError::ValidationError(_)
            | DomainError::DeviceNotFound(_)
            | DomainError::DeviceAlreadyExists(_) => false,
            DomainError::SchedulerError(e) => !e.is_invalid_expression(),
            DomainError::AdapterError(_) | DomainError::RepositoryError(_) => true,
        }
    }
}
