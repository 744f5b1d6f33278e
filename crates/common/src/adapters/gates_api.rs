use super::{device_url, ensure_success, transport_error};
use crate::domain::{AdapterError, AdapterResult, GateState, GateStatus, GatesClient};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct ChangeStateRequest {
    state: GateState,
}

/// HTTP client for gate controllers at `http://{host}`
#[derive(Clone)]
pub struct HttpGatesClient {
    http: reqwest::Client,
}

impl HttpGatesClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn post(&self, host: &str, path: &str, operation: &'static str) -> AdapterResult<()> {
        let response = self
            .http
            .post(device_url(host, path))
            .send()
            .await
            .map_err(transport_error(host))?;

        ensure_success(host, operation, &response)
    }
}

#[async_trait]
impl GatesClient for HttpGatesClient {
    #[instrument(skip(self))]
    async fn activate_gate(&self, host: &str) -> AdapterResult<()> {
        self.post(host, "/activate", "activate gate").await
    }

    #[instrument(skip(self))]
    async fn deactivate_gate(&self, host: &str) -> AdapterResult<()> {
        self.post(host, "/deactivate", "deactivate gate").await
    }

    #[instrument(skip(self))]
    async fn get_gate_status(&self, host: &str) -> AdapterResult<GateStatus> {
        let response = self
            .http
            .get(device_url(host, "/status"))
            .send()
            .await
            .map_err(transport_error(host))?;
        ensure_success(host, "get gate status", &response)?;

        let status = response
            .json::<GateStatus>()
            .await
            .map_err(|e| AdapterError::Decode {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        debug!(is_active = status.is_active, state = ?status.state, "gate status received");
        Ok(status)
    }

    #[instrument(skip(self))]
    async fn change_gate_state(&self, host: &str, state: GateState) -> AdapterResult<()> {
        let response = self
            .http
            .post(device_url(host, "/changestate"))
            .json(&ChangeStateRequest { state })
            .send()
            .await
            .map_err(transport_error(host))?;

        ensure_success(host, "change gate state", &response)
    }

    #[instrument(skip(self))]
    async fn health_check(&self, host: &str) -> AdapterResult<()> {
        let response = self
            .http
            .get(device_url(host, "/health"))
            .send()
            .await
            .map_err(transport_error(host))?;

        ensure_success(host, "gates health check", &response)
    }
}
