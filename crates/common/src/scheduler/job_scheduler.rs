use crate::scheduler::{CronSchedule, SchedulerError};
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 3;

/// Unit of recurring work; each call produces one run
pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct JobHandle {
    schedule: String,
    token: CancellationToken,
}

/// Tag-addressable registry of recurring cron jobs.
///
/// Every job runs in its own task. Runs across all jobs share a fixed pool of
/// permits; a tick that finds the pool saturated waits for a permit instead of
/// being dropped. Ticks are computed from the previous scheduled instant, so a
/// slow run delays later ticks of the same job but never skips them.
pub struct JobScheduler {
    jobs: Mutex<HashMap<Uuid, Vec<JobHandle>>>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl JobScheduler {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a recurring job under `tag`.
    ///
    /// Adding under a tag that already has a job creates a second schedule;
    /// use [`JobScheduler::replace_job`] to swap a schedule.
    pub async fn add_job<F, Fut>(
        &self,
        schedule: &CronSchedule,
        tag: Uuid,
        job: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let job: JobFn = Arc::new(move || Box::pin(job()));
        self.add_boxed_job(schedule, tag, job).await
    }

    pub async fn add_boxed_job(
        &self,
        schedule: &CronSchedule,
        tag: Uuid,
        job: JobFn,
    ) -> Result<(), SchedulerError> {
        if self.shutdown.is_cancelled() {
            return Err(SchedulerError::Stopped);
        }

        let mut jobs = self.jobs.lock().await;
        let handle = self.spawn_job(schedule, tag, job);

        let handles = jobs.entry(tag).or_default();
        handles.push(handle);

        if handles.len() > 1 {
            warn!(
                tag = %tag,
                job_count = handles.len(),
                "Multiple jobs scheduled under the same tag"
            );
        } else {
            debug!(tag = %tag, schedule = %schedule.expression(), "Job scheduled");
        }

        Ok(())
    }

    /// Cancel whatever runs under `tag` and register `job` in its place.
    ///
    /// Both steps happen under one lock, so concurrent replaces for the same
    /// tag always leave exactly one job behind.
    pub async fn replace_job<F, Fut>(
        &self,
        schedule: &CronSchedule,
        tag: Uuid,
        job: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let job: JobFn = Arc::new(move || Box::pin(job()));
        self.replace_boxed_job(schedule, tag, job).await
    }

    pub async fn replace_boxed_job(
        &self,
        schedule: &CronSchedule,
        tag: Uuid,
        job: JobFn,
    ) -> Result<(), SchedulerError> {
        if self.shutdown.is_cancelled() {
            return Err(SchedulerError::Stopped);
        }

        let mut jobs = self.jobs.lock().await;
        let handle = self.spawn_job(schedule, tag, job);

        let replaced = jobs.insert(tag, vec![handle]).unwrap_or_default();
        for old in &replaced {
            old.token.cancel();
        }

        debug!(
            tag = %tag,
            schedule = %schedule.expression(),
            replaced = replaced.len(),
            "Job replaced"
        );
        Ok(())
    }

    // caller holds the jobs lock
    fn spawn_job(&self, schedule: &CronSchedule, tag: Uuid, job: JobFn) -> JobHandle {
        let token = self.shutdown.child_token();
        self.tracker.spawn(run_job(
            tag,
            schedule.clone(),
            job,
            self.permits.clone(),
            token.clone(),
        ));
        JobHandle {
            schedule: schedule.expression().to_string(),
            token,
        }
    }

    /// Cancel every job under `tag`. Unknown tags are ignored.
    ///
    /// A run already in progress is allowed to finish; no further ticks fire.
    pub async fn remove_job(&self, tag: Uuid) {
        let removed = self.jobs.lock().await.remove(&tag);

        if let Some(handles) = removed {
            for handle in &handles {
                handle.token.cancel();
            }
            debug!(tag = %tag, removed = handles.len(), "Jobs removed");
        }
    }

    pub async fn job_count(&self, tag: Uuid) -> usize {
        self.jobs.lock().await.get(&tag).map_or(0, Vec::len)
    }

    pub async fn has_job(&self, tag: Uuid) -> bool {
        self.job_count(tag).await > 0
    }

    pub async fn tags(&self) -> Vec<Uuid> {
        self.jobs.lock().await.keys().copied().collect()
    }

    /// Schedule expression(s) currently registered under `tag`
    pub async fn schedules(&self, tag: Uuid) -> Vec<String> {
        self.jobs
            .lock()
            .await
            .get(&tag)
            .map(|handles| handles.iter().map(|h| h.schedule.clone()).collect())
            .unwrap_or_default()
    }

    /// Stop firing new runs and wait for in-flight runs, up to `deadline`
    pub async fn stop(&self, deadline: Duration) {
        info!("Stopping job scheduler");

        self.shutdown.cancel();
        self.permits.close();
        self.jobs.lock().await.clear();
        self.tracker.close();

        match tokio::time::timeout(deadline, self.tracker.wait()).await {
            Ok(()) => info!("Job scheduler stopped"),
            Err(_) => warn!(
                deadline_ms = deadline.as_millis() as u64,
                in_flight = self.tracker.len(),
                "Job scheduler stop deadline exceeded"
            ),
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_JOBS)
    }
}

async fn run_job(
    tag: Uuid,
    schedule: CronSchedule,
    job: JobFn,
    permits: Arc<Semaphore>,
    token: CancellationToken,
) {
    let mut cursor = Utc::now();

    loop {
        let Some(next) = schedule.next_after(&cursor) else {
            debug!(tag = %tag, "Schedule has no upcoming ticks");
            return;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        let permit = tokio::select! {
            _ = token.cancelled() => return,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                // semaphore closed by stop()
                Err(_) => return,
            },
        };

        if let Err(e) = job().await {
            warn!(tag = %tag, error = %e, "Scheduled job failed");
        }
        drop(permit);

        cursor = next;
    }
}
