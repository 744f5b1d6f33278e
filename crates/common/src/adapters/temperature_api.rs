use super::{device_url, ensure_success, transport_error};
use crate::domain::{AdapterError, AdapterResult, TemperatureClient, TemperatureReading};
use async_trait::async_trait;
use tracing::instrument;

/// HTTP client for temperature sensor services at `http://{host}`
#[derive(Clone)]
pub struct HttpTemperatureClient {
    http: reqwest::Client,
}

impl HttpTemperatureClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn read(
        &self,
        host: &str,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> AdapterResult<TemperatureReading> {
        let response = request.send().await.map_err(transport_error(host))?;
        ensure_success(host, operation, &response)?;

        response
            .json::<TemperatureReading>()
            .await
            .map_err(|e| AdapterError::Decode {
                host: host.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl TemperatureClient for HttpTemperatureClient {
    #[instrument(skip(self))]
    async fn get_temperature(
        &self,
        host: &str,
        location: &str,
    ) -> AdapterResult<TemperatureReading> {
        let request = self
            .http
            .get(device_url(host, "/temperature"))
            .query(&[("location", location)]);

        self.read(host, request, "get temperature").await
    }

    #[instrument(skip(self))]
    async fn get_temperature_by_sensor_id(
        &self,
        host: &str,
        sensor_id: i64,
    ) -> AdapterResult<TemperatureReading> {
        let request = self
            .http
            .get(device_url(host, &format!("/temperature/{sensor_id}")));

        self.read(host, request, "get temperature by sensor id").await
    }

    #[instrument(skip(self))]
    async fn health_check(&self, host: &str) -> AdapterResult<()> {
        let response = self
            .http
            .get(device_url(host, "/health"))
            .send()
            .await
            .map_err(transport_error(host))?;

        ensure_success(host, "temperature health check", &response)
    }
}
