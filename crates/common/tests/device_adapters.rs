// HTTP device adapter tests against a wiremock server.

use common::adapters::{build_adapter_http_client, HttpGatesClient, HttpTemperatureClient};
use common::domain::{AdapterError, GateState, GatesClient, TemperatureClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, String) {
    let server = MockServer::start().await;
    let host = server.uri().trim_start_matches("http://").to_string();
    (server, host)
}

fn http() -> reqwest::Client {
    build_adapter_http_client(Duration::from_secs(10)).unwrap()
}

#[tokio::test]
async fn test_activate_gate_posts_to_activate() {
    let (server, host) = setup().await;

    Mock::given(method("POST"))
        .and(path("/activate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    HttpGatesClient::new(http()).activate_gate(&host).await.unwrap();
}

#[tokio::test]
async fn test_deactivate_gate_non_200_is_error() {
    let (server, host) = setup().await;

    Mock::given(method("POST"))
        .and(path("/deactivate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = HttpGatesClient::new(http()).deactivate_gate(&host).await;
    assert!(
        matches!(result, Err(AdapterError::UnexpectedStatus { status: 503, .. })),
        "expected UnexpectedStatus, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_gate_status_decodes_body() {
    let (server, host) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"is_active": true, "state": "open"})),
        )
        .mount(&server)
        .await;

    let status = HttpGatesClient::new(http())
        .get_gate_status(&host)
        .await
        .unwrap();
    assert!(status.is_active);
    assert_eq!(status.state, GateState::Open);
}

#[tokio::test]
async fn test_get_gate_status_malformed_body() {
    let (server, host) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = HttpGatesClient::new(http()).get_gate_status(&host).await;
    assert!(matches!(result, Err(AdapterError::Decode { .. })));
}

#[tokio::test]
async fn test_change_gate_state_sends_state() {
    let (server, host) = setup().await;

    Mock::given(method("POST"))
        .and(path("/changestate"))
        .and(body_json(json!({"state": "closed"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    HttpGatesClient::new(http())
        .change_gate_state(&host, GateState::Closed)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_temperature_by_location() {
    let (server, host) = setup().await;

    Mock::given(method("GET"))
        .and(path("/temperature"))
        .and(query_param("location", "Living Room"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "temperature": 21.5,
            "location": "Living Room",
            "sensor_id": "1"
        })))
        .mount(&server)
        .await;

    let reading = HttpTemperatureClient::new(http())
        .get_temperature(&host, "Living Room")
        .await
        .unwrap();
    assert_eq!(reading.temperature, 21.5);
    assert_eq!(reading.location, "Living Room");
    assert_eq!(reading.sensor_id, "1");
}

#[tokio::test]
async fn test_get_temperature_by_sensor_id() {
    let (server, host) = setup().await;

    Mock::given(method("GET"))
        .and(path("/temperature/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temperature": -3.0})))
        .mount(&server)
        .await;

    let reading = HttpTemperatureClient::new(http())
        .get_temperature_by_sensor_id(&host, 42)
        .await
        .unwrap();
    assert_eq!(reading.temperature, -3.0);
    assert_eq!(reading.location, "");
}

#[tokio::test]
async fn test_health_checks() {
    let (server, host) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(2)
        .mount(&server)
        .await;

    HttpGatesClient::new(http()).health_check(&host).await.unwrap();
    HttpTemperatureClient::new(http())
        .health_check(&host)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let client = HttpTemperatureClient::new(
        build_adapter_http_client(Duration::from_millis(500)).unwrap(),
    );

    let result = client.health_check("127.0.0.1:1").await;
    assert!(matches!(result, Err(AdapterError::Transport { .. })));
}
