use crate::broker::DeviceEventConsumer;
use crate::domain::{
    DeviceOrchestratorConfig, DeviceServices, DeviceStarter, EventRouter, GatesService,
    WarmingService,
};
use common::broker::BrokerController;
use common::domain::{
    DeviceRepository, DomainEventKind, GatesClient, TelemetryRepository, TemperatureClient,
};
use common::scheduler::JobScheduler;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Boxed long-running process, started with the root cancellation token
pub type OrchestratorProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;

/// Collaborators the orchestrator is wired against
pub struct OrchestratorDependencies {
    pub device_repository: Arc<dyn DeviceRepository>,
    pub telemetry_repository: Arc<dyn TelemetryRepository>,
    pub gates_client: Arc<dyn GatesClient>,
    pub temperature_client: Arc<dyn TemperatureClient>,
    pub broker: Arc<dyn BrokerController>,
    pub scheduler: Arc<JobScheduler>,
}

pub struct DeviceOrchestrator {
    consumers: Vec<DeviceEventConsumer>,
}

impl DeviceOrchestrator {
    /// Wire the lifecycle services and re-arm the jobs of every persisted
    /// Active or Unknown device. Consumers are built but not started.
    pub async fn new(
        deps: OrchestratorDependencies,
        config: DeviceOrchestratorConfig,
    ) -> anyhow::Result<Self> {
        debug!("initializing device orchestrator");

        let gates = Arc::new(GatesService::new(
            Arc::clone(&deps.device_repository),
            Arc::clone(&deps.telemetry_repository),
            deps.gates_client,
            Arc::clone(&deps.scheduler),
            config.default_gates_schedule.clone(),
        ));
        let warming = Arc::new(WarmingService::new(
            Arc::clone(&deps.device_repository),
            deps.telemetry_repository,
            deps.temperature_client,
            Arc::clone(&deps.scheduler),
            config.default_temperature_schedule.clone(),
        ));
        let services = DeviceServices::new(gates, warming);

        // restore in-memory schedules before accepting new events
        let armed = DeviceStarter::new(deps.device_repository, services.clone())
            .start()
            .await?;
        info!(armed, "device orchestrator started");

        let router = EventRouter::new(services);
        let consumers = DomainEventKind::ALL
            .into_iter()
            .map(|kind| {
                DeviceEventConsumer::new(
                    Arc::clone(&deps.broker),
                    config.channels.channel(kind),
                    kind,
                    router.clone(),
                )
            })
            .collect();

        Ok(Self { consumers })
    }

    /// One named process per channel consumer
    pub fn into_runner_processes(self) -> Vec<(String, OrchestratorProcess)> {
        self.consumers
            .into_iter()
            .map(|consumer| {
                let name = format!("consumer:{}", consumer.channel());
                let process: OrchestratorProcess =
                    Box::new(move |ctx| Box::pin(async move { consumer.run(ctx).await }));
                (name, process)
            })
            .collect()
    }
}
