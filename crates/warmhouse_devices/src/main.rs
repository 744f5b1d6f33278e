mod config;

use common::adapters::{build_adapter_http_client, HttpGatesClient, HttpTemperatureClient};
use common::broker::{BrokerController, NatsBrokerController};
use common::domain::{DeviceRepository, TelemetryRepository};
use common::postgres::{
    run_migrations, PostgresClient, PostgresDeviceRepository, PostgresTelemetryRepository,
};
use common::scheduler::JobScheduler;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders};
use config::ServiceConfig;
use device_orchestrator::{DeviceOrchestrator, OrchestratorDependencies};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use warmhouse_runner::Runner;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry (tracing + OpenTelemetry for traces and logs)
    let telemetry_providers: Option<TelemetryProviders> =
        match init_telemetry(&config.telemetry_config()) {
            Ok(providers) => providers,
            Err(e) => {
                eprintln!("Failed to initialize telemetry: {}", e);
                std::process::exit(1);
            }
        };

    info!(
        otel_enabled = config.otel_enabled,
        otel_endpoint = %config.otel_endpoint,
        "Starting warmhouse-devices service"
    );
    debug!("Configuration: {:?}", config);

    let deps = match initialize_dependencies(&config).await {
        Ok(deps) => deps,
        Err(e) => {
            error!("Failed to initialize dependencies: {:#}", e);
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };
    let scheduler = Arc::clone(&deps.scheduler);

    // Re-arms persisted devices before any consumer starts
    let orchestrator =
        match DeviceOrchestrator::new(deps, config.orchestrator_config()).await {
            Ok(orchestrator) => orchestrator,
            Err(e) => {
                error!("Failed to initialize device orchestrator: {:#}", e);
                shutdown_telemetry(telemetry_providers);
                std::process::exit(1);
            }
        };

    let mut runner = Runner::new();
    for (name, process) in orchestrator.into_runner_processes() {
        runner = runner.with_boxed_process(name, process);
    }

    let shutdown_deadline = config.shutdown_deadline();
    runner = runner
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            scheduler.stop(shutdown_deadline).await;

            // Shutdown telemetry and flush pending traces and logs
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .with_closer_timeout(shutdown_deadline + Duration::from_secs(5));

    if let Err(e) = runner.run().await {
        eprintln!("warmhouse-devices stopped with error: {:#}", e);
        std::process::exit(1);
    }
}

async fn initialize_dependencies(
    config: &ServiceConfig,
) -> anyhow::Result<OrchestratorDependencies> {
    let startup_timeout = config.startup_timeout();

    // PostgreSQL initialization
    info!("Initializing PostgreSQL...");
    let postgres_client = PostgresClient::new(&config.postgres_config())?;
    tokio::time::timeout(startup_timeout, async {
        postgres_client.ping().await?;
        run_migrations(&postgres_client).await
    })
    .await
    .map_err(|_| anyhow::anyhow!("PostgreSQL not ready after {:?}", startup_timeout))??;

    let device_repository: Arc<dyn DeviceRepository> =
        Arc::new(PostgresDeviceRepository::new(postgres_client.clone()));
    let telemetry_repository: Arc<dyn TelemetryRepository> =
        Arc::new(PostgresTelemetryRepository::new(postgres_client));

    // NATS initialization
    info!("Initializing NATS...");
    let broker: Arc<dyn BrokerController> =
        Arc::new(NatsBrokerController::connect(&config.nats_config()).await?);

    // Device adapters share one HTTP client
    let http = build_adapter_http_client(config.adapter_timeout())?;

    Ok(OrchestratorDependencies {
        device_repository,
        telemetry_repository,
        gates_client: Arc::new(HttpGatesClient::new(http.clone())),
        temperature_client: Arc::new(HttpTemperatureClient::new(http)),
        broker,
        scheduler: Arc::new(JobScheduler::new(config.scheduler_max_concurrent_jobs)),
    })
}
