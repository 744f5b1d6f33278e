use async_trait::async_trait;
use common::domain::DomainResult;
use common::scheduler::{CronSchedule, JobScheduler};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// One poll-and-record cycle for a single device, run on every tick of the
/// device's health-check job
#[async_trait]
pub trait HealthCheckTask: Send + Sync {
    fn device_id(&self) -> Uuid;

    async fn run(&self) -> DomainResult<()>;
}

/// Replace the device's job with one running `task` on `schedule`.
///
/// A device id maps to at most one job, however often or concurrently the
/// device is armed.
pub async fn arm_health_check(
    scheduler: &JobScheduler,
    schedule: &CronSchedule,
    task: Arc<dyn HealthCheckTask>,
) -> DomainResult<()> {
    let device_id = task.device_id();
    scheduler
        .replace_job(schedule, device_id, move || {
            let task = Arc::clone(&task);
            async move { task.run().await.map_err(anyhow::Error::from) }
        })
        .await?;

    debug!(
        device_id = %device_id,
        schedule = %schedule.expression(),
        "health check armed"
    );
    Ok(())
}
