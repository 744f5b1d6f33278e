#![cfg(feature = "integration-tests")]

use common::domain::{
    CreateDeviceInput, Device, DeviceRepository, DeviceStatus, DeviceType, DomainError, Telemetry,
    TelemetryRepository,
};
use common::postgres::{
    run_migrations, PostgresClient, PostgresConfig, PostgresDeviceRepository,
    PostgresTelemetryRepository,
};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresClient) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let client = PostgresClient::new(&PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 5,
    })
    .unwrap();

    run_migrations(&client).await.expect("Migrations failed");
    // second run must be a no-op
    run_migrations(&client).await.expect("Migrations not idempotent");

    (postgres, client)
}

fn new_device(house_id: Uuid, device_type: DeviceType) -> Device {
    Device::from_create_input(
        CreateDeviceInput {
            device_id: Uuid::new_v4(),
            house_id,
            device_type,
            name: "Front gate".to_string(),
            host: "gate1:9000".to_string(),
            location: Some("Porch".to_string()),
            value: None,
            sensor_id: Some(3),
            schedule: None,
        },
        "*/30 * * * * *",
    )
}

#[tokio::test]
async fn test_create_get_update_delete_device() {
    let (_container, client) = setup_test_db().await;
    let repo = PostgresDeviceRepository::new(client);

    let created = repo
        .create_device(new_device(Uuid::new_v4(), DeviceType::Gates))
        .await
        .unwrap();
    assert!(created.created_at.is_some());

    let mut fetched = repo.get_device(created.device_id).await.unwrap().unwrap();
    assert_eq!(fetched.device_type, DeviceType::Gates);
    assert_eq!(fetched.status, DeviceStatus::Unknown);
    assert_eq!(fetched.sensor_id, Some(3));

    fetched.status = DeviceStatus::Active;
    fetched.value = "opened".to_string();
    repo.update_device(fetched).await.unwrap();

    let updated = repo.get_device(created.device_id).await.unwrap().unwrap();
    assert_eq!(updated.status, DeviceStatus::Active);
    assert_eq!(updated.value, "opened");

    repo.delete_device(created.device_id).await.unwrap();
    assert!(repo.get_device(created.device_id).await.unwrap().is_none());

    // deleting again is a no-op
    repo.delete_device(created.device_id).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_create_and_missing_update() {
    let (_container, client) = setup_test_db().await;
    let repo = PostgresDeviceRepository::new(client);

    let device = new_device(Uuid::new_v4(), DeviceType::Temperature);
    repo.create_device(device.clone()).await.unwrap();

    let duplicate = repo.create_device(device.clone()).await;
    assert!(matches!(duplicate, Err(DomainError::DeviceAlreadyExists(_))));

    let missing = repo
        .update_device(new_device(Uuid::new_v4(), DeviceType::Temperature))
        .await;
    assert!(matches!(missing, Err(DomainError::DeviceNotFound(_))));
}

#[tokio::test]
async fn test_house_user_and_active_queries() {
    let (_container, client) = setup_test_db().await;
    let repo = PostgresDeviceRepository::new(client.clone());

    let user_id = Uuid::new_v4();
    let house_id = Uuid::new_v4();
    let conn = client.get_connection().await.unwrap();
    conn.execute(
        "INSERT INTO warmhouse.houses (id, user_id, name) VALUES ($1, $2, 'Home')",
        &[&house_id, &user_id],
    )
    .await
    .unwrap();

    let gate = repo
        .create_device(new_device(house_id, DeviceType::Gates))
        .await
        .unwrap();
    let sensor = repo
        .create_device(new_device(house_id, DeviceType::Temperature))
        .await
        .unwrap();
    repo.create_device(new_device(Uuid::new_v4(), DeviceType::Gates))
        .await
        .unwrap();

    assert_eq!(repo.get_house_devices(house_id).await.unwrap().len(), 2);
    assert_eq!(repo.get_user_devices(user_id).await.unwrap().len(), 2);

    repo.set_device_status(sensor.device_id, DeviceStatus::Inactive)
        .await
        .unwrap();
    let active = repo.get_all_active_devices().await.unwrap();
    assert!(active.iter().any(|d| d.device_id == gate.device_id));
    assert!(!active.iter().any(|d| d.device_id == sensor.device_id));
}

#[tokio::test]
async fn test_add_telemetry() {
    let (_container, client) = setup_test_db().await;
    let repo = PostgresTelemetryRepository::new(client.clone());
    let device_id = Uuid::new_v4();

    repo.add_telemetry(Telemetry::now(
        device_id,
        serde_json::json!({"temperature": 21.5, "location": "Kitchen", "sensor_id": "1"}),
    ))
    .await
    .unwrap();

    let conn = client.get_connection().await.unwrap();
    let row = conn
        .query_one(
            "SELECT data FROM warmhouse.telemetry WHERE device_id = $1",
            &[&device_id],
        )
        .await
        .unwrap();
    let data: serde_json::Value = row.get(0);
    assert_eq!(data["temperature"], 21.5);
}
