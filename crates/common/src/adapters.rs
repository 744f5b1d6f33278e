mod gates_api;
mod temperature_api;

pub use gates_api::*;
pub use temperature_api::*;

use crate::domain::{AdapterError, AdapterResult};
use std::time::Duration;

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared reqwest client for device adapters, with a fixed request timeout
pub fn build_adapter_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn device_url(host: &str, path: &str) -> String {
    format!("http://{host}{path}")
}

fn transport_error(host: &str) -> impl FnOnce(reqwest::Error) -> AdapterError + '_ {
    move |source| AdapterError::Transport {
        host: host.to_string(),
        source,
    }
}

fn ensure_success(
    host: &str,
    operation: &'static str,
    response: &reqwest::Response,
) -> AdapterResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(AdapterError::UnexpectedStatus {
            host: host.to_string(),
            operation,
            status: response.status().as_u16(),
        })
    }
}
