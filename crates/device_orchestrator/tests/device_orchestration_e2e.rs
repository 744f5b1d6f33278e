// End-to-end tests of the orchestrator over the in-memory broker and store,
// with mocked device adapters.

use common::broker::{BrokerController, DeviceEventProducer, EventChannels, InMemoryBroker};
use common::domain::{
    AdapterError, CreateDeviceInput, Device, DeviceCreatedPayload, DeviceRepository,
    DeviceStatus, DeviceType, DeviceUpdatedPayload, DomainEvent, GateState, GateStatus,
    MockGatesClient, MockTemperatureClient, TemperatureReading, UpdateDeviceInput,
};
use common::memory::InMemoryDeviceStore;
use common::scheduler::JobScheduler;
use device_orchestrator::domain::{
    DeviceLifecycleService, DeviceOrchestratorConfig, GatesService, HealthCheckTask,
    TemperatureCheck, WarmingService,
};
use device_orchestrator::{DeviceOrchestrator, OrchestratorDependencies};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const GATE_SCHEDULE: &str = "*/30 * * * * *";

struct Harness {
    store: InMemoryDeviceStore,
    broker: InMemoryBroker,
    scheduler: Arc<JobScheduler>,
    producer: DeviceEventProducer,
    token: CancellationToken,
    processes: Vec<JoinHandle<anyhow::Result<()>>>,
}

impl Harness {
    async fn start(
        store: InMemoryDeviceStore,
        gates: MockGatesClient,
        temperature: MockTemperatureClient,
    ) -> Self {
        let broker = InMemoryBroker::new();
        let scheduler = Arc::new(JobScheduler::new(3));
        let token = CancellationToken::new();

        let orchestrator = DeviceOrchestrator::new(
            OrchestratorDependencies {
                device_repository: Arc::new(store.clone()),
                telemetry_repository: Arc::new(store.clone()),
                gates_client: Arc::new(gates),
                temperature_client: Arc::new(temperature),
                broker: Arc::new(broker.clone()),
                scheduler: Arc::clone(&scheduler),
            },
            DeviceOrchestratorConfig::default(),
        )
        .await
        .unwrap();

        let processes = orchestrator
            .into_runner_processes()
            .into_iter()
            .map(|(_, process)| tokio::spawn(process(token.clone())))
            .collect();

        let producer_broker: Arc<dyn BrokerController> = Arc::new(broker.clone());
        Self {
            store,
            broker,
            scheduler,
            producer: DeviceEventProducer::new(producer_broker, EventChannels::default()),
            token,
            processes,
        }
    }

    async fn publish(&self, event: DomainEvent) {
        self.producer.publish(&event).await.unwrap();
    }

    async fn device(&self, device_id: Uuid) -> Option<Device> {
        self.store.get_device(device_id).await.unwrap()
    }

    /// Poll the store until the device exists and satisfies `predicate`
    async fn wait_for_device<P>(&self, device_id: Uuid, what: &str, predicate: P)
    where
        P: Fn(&Device) -> bool,
    {
        for _ in 0..150 {
            if self.device(device_id).await.as_ref().is_some_and(&predicate) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for {what}");
    }

    async fn wait_until_armed(&self, device_id: Uuid) {
        for _ in 0..150 {
            if self.scheduler.has_job(device_id).await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for the job of {device_id}");
    }

    async fn shutdown(self) {
        self.token.cancel();
        for process in self.processes {
            process.await.unwrap().unwrap();
        }
        self.scheduler.stop(Duration::from_secs(1)).await;
    }
}

fn gate_created(device_id: Uuid, house_id: Uuid) -> DomainEvent {
    DomainEvent::DeviceCreated(DeviceCreatedPayload {
        device_id: device_id.to_string(),
        house_id: house_id.to_string(),
        device_type: "gates".to_string(),
        name: "Front gate".to_string(),
        unit: None,
        value: None,
        location: None,
        sensor_id: None,
        host: "gate1:9000".to_string(),
        schedule: Some(GATE_SCHEDULE.to_string()),
    })
}

fn gate_updated(device_id: Uuid, house_id: Uuid) -> DeviceUpdatedPayload {
    DeviceUpdatedPayload {
        device_id: device_id.to_string(),
        house_id: house_id.to_string(),
        device_type: "gates".to_string(),
        ..Default::default()
    }
}

/// Gate controller whose reported activity follows activate/deactivate calls
fn stateful_gate(activations: Arc<AtomicUsize>) -> MockGatesClient {
    let active = Arc::new(AtomicBool::new(false));
    let mut gates = MockGatesClient::new();

    let flag = Arc::clone(&active);
    gates
        .expect_activate_gate()
        .withf(|host| host == "gate1:9000")
        .returning(move |_| {
            flag.store(true, Ordering::SeqCst);
            activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    let flag = Arc::clone(&active);
    gates.expect_deactivate_gate().returning(move |_| {
        flag.store(false, Ordering::SeqCst);
        Ok(())
    });
    gates.expect_get_gate_status().returning(move |_| {
        Ok(GateStatus {
            is_active: active.load(Ordering::SeqCst),
            state: GateState::Closed,
        })
    });
    gates
}

#[tokio::test]
async fn test_gate_activation_scenario_keeps_one_job() {
    let activations = Arc::new(AtomicUsize::new(0));
    let gates = stateful_gate(Arc::clone(&activations));

    let harness = Harness::start(
        InMemoryDeviceStore::new(),
        gates,
        MockTemperatureClient::new(),
    )
    .await;
    let device_id = Uuid::new_v4();
    let house_id = Uuid::new_v4();

    harness.publish(gate_created(device_id, house_id)).await;
    harness.wait_for_device(device_id, "device row", |_| true).await;
    harness.wait_until_armed(device_id).await;
    assert_eq!(harness.scheduler.job_count(device_id).await, 1);

    harness
        .publish(DomainEvent::DeviceUpdated(DeviceUpdatedPayload {
            status: Some("active".to_string()),
            ..gate_updated(device_id, house_id)
        }))
        .await;
    harness
        .wait_for_device(device_id, "active status", |d| d.status == DeviceStatus::Active)
        .await;
    assert_eq!(activations.load(Ordering::SeqCst), 1);
    assert_eq!(harness.scheduler.job_count(device_id).await, 1);

    harness
        .publish(DomainEvent::DeviceUpdated(DeviceUpdatedPayload {
            schedule: Some("0 */5 * * * *".to_string()),
            ..gate_updated(device_id, house_id)
        }))
        .await;
    harness
        .wait_for_device(device_id, "new schedule", |d| d.schedule == "0 */5 * * * *")
        .await;
    assert_eq!(
        harness.scheduler.schedules(device_id).await,
        vec!["0 */5 * * * *".to_string()]
    );

    harness.shutdown().await;
}

#[tokio::test]
async fn test_redelivered_create_yields_one_row_and_one_job() {
    let harness = Harness::start(
        InMemoryDeviceStore::new(),
        stateful_gate(Arc::new(AtomicUsize::new(0))),
        MockTemperatureClient::new(),
    )
    .await;
    let device_id = Uuid::new_v4();
    let marker_id = Uuid::new_v4();
    let house_id = Uuid::new_v4();

    harness.publish(gate_created(device_id, house_id)).await;
    harness.publish(gate_created(device_id, house_id)).await;
    // the channel is processed in order, so the marker lands last
    harness.publish(gate_created(marker_id, house_id)).await;

    harness.wait_for_device(marker_id, "marker row", |_| true).await;
    assert_eq!(harness.store.device_count().await, 2);
    assert_eq!(harness.scheduler.job_count(device_id).await, 1);
    assert_eq!(harness.broker.pending("device.created").await, 0);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_invalid_update_is_dropped() {
    let harness = Harness::start(
        InMemoryDeviceStore::new(),
        stateful_gate(Arc::new(AtomicUsize::new(0))),
        MockTemperatureClient::new(),
    )
    .await;
    let device_id = Uuid::new_v4();
    let house_id = Uuid::new_v4();

    harness.publish(gate_created(device_id, house_id)).await;
    harness.wait_for_device(device_id, "device row", |_| true).await;

    harness
        .publish(DomainEvent::DeviceUpdated(DeviceUpdatedPayload {
            name: Some("Renamed".to_string()),
            value: Some("ajar".to_string()),
            ..gate_updated(device_id, house_id)
        }))
        .await;
    harness
        .publish(DomainEvent::DeviceUpdated(DeviceUpdatedPayload {
            location: Some("Driveway".to_string()),
            ..gate_updated(device_id, house_id)
        }))
        .await;

    harness
        .wait_for_device(device_id, "valid update", |d| d.location == "Driveway")
        .await;
    let device = harness.device(device_id).await.unwrap();
    assert_eq!(device.name, "Front gate");
    assert_eq!(device.value, "closed");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_startup_rearms_active_and_unknown_devices() {
    let store = InMemoryDeviceStore::new();
    let active = seed(&store, DeviceType::Gates, "gate1:9000", Uuid::new_v4()).await;
    let unknown = seed(&store, DeviceType::Temperature, "sensor:8081", Uuid::new_v4()).await;
    let inactive = seed(&store, DeviceType::Gates, "gate2:9000", Uuid::new_v4()).await;
    store
        .set_device_status(active, DeviceStatus::Active)
        .await
        .unwrap();
    store
        .set_device_status(inactive, DeviceStatus::Inactive)
        .await
        .unwrap();

    let mut temperature = MockTemperatureClient::new();
    temperature.expect_get_temperature().returning(|_, location| {
        Ok(TemperatureReading {
            temperature: 20.0,
            location: location.to_string(),
            sensor_id: "1".to_string(),
        })
    });

    let harness = Harness::start(
        store,
        stateful_gate(Arc::new(AtomicUsize::new(0))),
        temperature,
    )
    .await;

    assert!(harness.scheduler.has_job(active).await);
    assert!(harness.scheduler.has_job(unknown).await);
    assert!(!harness.scheduler.has_job(inactive).await);

    harness.shutdown().await;
}

async fn seed(
    store: &InMemoryDeviceStore,
    device_type: DeviceType,
    host: &str,
    house_id: Uuid,
) -> Uuid {
    let device = Device::from_create_input(
        CreateDeviceInput {
            device_id: Uuid::new_v4(),
            house_id,
            device_type,
            name: host.to_string(),
            host: host.to_string(),
            location: Some("Hall".to_string()),
            value: None,
            sensor_id: None,
            schedule: None,
        },
        "0 0 0 1 1 *",
    );
    let id = store.create_device(device).await.unwrap().device_id;
    // keep created_at strictly increasing for ordered listings
    tokio::time::sleep(Duration::from_millis(5)).await;
    id
}

#[tokio::test]
async fn test_house_delete_stops_at_failing_device() {
    let store = InMemoryDeviceStore::new();
    let house_id = Uuid::new_v4();
    let first = seed(&store, DeviceType::Gates, "gate1:9000", house_id).await;
    let failing = seed(&store, DeviceType::Gates, "gate2:9000", house_id).await;
    let last = seed(&store, DeviceType::Gates, "gate3:9000", house_id).await;

    let mut gates = MockGatesClient::new();
    gates.expect_deactivate_gate().returning(|host| {
        if host == "gate2:9000" {
            Err(AdapterError::UnexpectedStatus {
                host: host.to_string(),
                operation: "deactivate gate",
                status: 503,
            })
        } else {
            Ok(())
        }
    });

    let scheduler = Arc::new(JobScheduler::new(3));
    let service = GatesService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(gates),
        Arc::clone(&scheduler),
        GATE_SCHEDULE,
    );

    assert!(service.delete_house_devices(house_id).await.is_err());
    assert!(store.get_device(first).await.unwrap().is_none());
    assert!(store.get_device(failing).await.unwrap().is_some());
    assert!(store.get_device(last).await.unwrap().is_some());
}

#[tokio::test]
async fn test_health_check_records_once_or_marks_unknown() {
    let store = InMemoryDeviceStore::new();
    let healthy = seed(&store, DeviceType::Temperature, "sensor-ok:8081", Uuid::new_v4()).await;
    let broken = seed(&store, DeviceType::Temperature, "sensor-down:8081", Uuid::new_v4()).await;

    let mut temperature = MockTemperatureClient::new();
    temperature.expect_get_temperature().returning(|host, location| {
        if host == "sensor-down:8081" {
            Err(AdapterError::UnexpectedStatus {
                host: host.to_string(),
                operation: "get temperature",
                status: 500,
            })
        } else {
            Ok(TemperatureReading {
                temperature: 19.5,
                location: location.to_string(),
                sensor_id: "4".to_string(),
            })
        }
    });
    let temperature = Arc::new(temperature);

    let check = |device_id| {
        TemperatureCheck::new(
            device_id,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            temperature.clone(),
        )
    };

    let before = chrono::Utc::now();
    check(healthy).run().await.unwrap();
    assert!(check(broken).run().await.is_err());

    let recorded = store.telemetry_for(healthy).await;
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].timestamp >= before);
    assert!(recorded[0].timestamp - before < chrono::Duration::seconds(5));
    assert_eq!(recorded[0].data["temperature"], 19.5);
    assert_eq!(
        store.get_device(healthy).await.unwrap().unwrap().status,
        DeviceStatus::Active
    );

    assert!(store.telemetry_for(broken).await.is_empty());
    assert_eq!(
        store.get_device(broken).await.unwrap().unwrap().status,
        DeviceStatus::Unknown
    );
}

/// Race one update against a delete of the same device, then check that
/// neither the row nor a job under the device id survives
async fn race_update_and_delete(
    store: &InMemoryDeviceStore,
    scheduler: &Arc<JobScheduler>,
    service: Arc<dyn DeviceLifecycleService>,
    device_id: Uuid,
    update: UpdateDeviceInput,
) {
    let updater = Arc::clone(&service);
    let update = tokio::spawn(async move { updater.update_device(update).await });
    let deleter = Arc::clone(&service);
    let delete = tokio::spawn(async move { deleter.delete_device(device_id).await });

    // either side may lose the race, but nothing of the device survives
    let _ = update.await.unwrap();
    delete.await.unwrap().unwrap();
    assert!(store.get_device(device_id).await.unwrap().is_none());
    assert!(
        !scheduler.has_job(device_id).await,
        "job left behind for deleted device"
    );
}

fn warming_service(
    store: &InMemoryDeviceStore,
    scheduler: &Arc<JobScheduler>,
) -> Arc<WarmingService> {
    Arc::new(WarmingService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(MockTemperatureClient::new()),
        Arc::clone(scheduler),
        "0 * * * * *",
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_rename_and_delete_leave_nothing() {
    for _ in 0..20 {
        let store = InMemoryDeviceStore::new();
        let scheduler = Arc::new(JobScheduler::new(3));
        let device_id = seed(&store, DeviceType::Temperature, "sensor:8081", Uuid::new_v4()).await;

        let update = UpdateDeviceInput {
            device_id,
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let service = warming_service(&store, &scheduler);
        race_update_and_delete(&store, &scheduler, service, device_id, update).await;
        scheduler.stop(Duration::from_secs(1)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sensor_rearm_and_delete_leave_no_job() {
    for i in 0..40 {
        let store = InMemoryDeviceStore::new();
        let scheduler = Arc::new(JobScheduler::new(3));
        let device_id = seed(&store, DeviceType::Temperature, "sensor:8081", Uuid::new_v4()).await;

        // alternate the two update shapes that re-arm a sensor
        let update = if i % 2 == 0 {
            UpdateDeviceInput {
                device_id,
                status: Some(DeviceStatus::Active),
                ..Default::default()
            }
        } else {
            UpdateDeviceInput {
                device_id,
                schedule: Some("*/15 * * * * *".to_string()),
                ..Default::default()
            }
        };
        let service = warming_service(&store, &scheduler);
        race_update_and_delete(&store, &scheduler, service, device_id, update).await;
        scheduler.stop(Duration::from_secs(1)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gate_rearm_and_delete_leave_no_job() {
    for i in 0..40 {
        let store = InMemoryDeviceStore::new();
        let scheduler = Arc::new(JobScheduler::new(3));
        let device_id = seed(&store, DeviceType::Gates, "gate1:9000", Uuid::new_v4()).await;

        let service = Arc::new(GatesService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(stateful_gate(Arc::new(AtomicUsize::new(0)))),
            Arc::clone(&scheduler),
            GATE_SCHEDULE,
        ));

        let update = if i % 2 == 0 {
            UpdateDeviceInput {
                device_id,
                status: Some(DeviceStatus::Active),
                ..Default::default()
            }
        } else {
            UpdateDeviceInput {
                device_id,
                schedule: Some("0 */5 * * * *".to_string()),
                ..Default::default()
            }
        };
        race_update_and_delete(&store, &scheduler, service, device_id, update).await;
        scheduler.stop(Duration::from_secs(1)).await;
    }
}
