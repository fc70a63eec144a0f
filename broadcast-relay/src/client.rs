//! HTTP client for the external broadcast controller.
//!
//! The controller exposes three endpoints under `/stream`, authenticated
//! with a bearer password. Every call carries a bounded timeout; the
//! control plane must never hang an API handler.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::RelayError;

/// Reply from `GET /stream/status`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RelayStatus {
    pub streaming: bool,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl Default for RelayClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl RelayClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Ask the controller to begin relaying to `stream_url`/`stream_key`.
    pub async fn start(
        &self,
        address: &str,
        password: &str,
        stream_url: &str,
        stream_key: &str,
    ) -> Result<(), RelayError> {
        let reply = self
            .http
            .post(format!("http://{address}/stream/start"))
            .bearer_auth(password)
            .timeout(self.timeout)
            .json(&json!({ "stream_url": stream_url, "stream_key": stream_key }))
            .send()
            .await
            .map_err(|e| RelayError::unreachable(address, e))?;
        Self::accepted(address, &reply)?;
        tracing::info!("relay at {} started streaming to {}", address, stream_url);
        Ok(())
    }

    pub async fn stop(&self, address: &str, password: &str) -> Result<(), RelayError> {
        let reply = self
            .http
            .post(format!("http://{address}/stream/stop"))
            .bearer_auth(password)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::unreachable(address, e))?;
        Self::accepted(address, &reply)?;
        tracing::info!("relay at {} stopped streaming", address);
        Ok(())
    }

    pub async fn status(&self, address: &str, password: &str) -> Result<RelayStatus, RelayError> {
        let reply = self
            .http
            .get(format!("http://{address}/stream/status"))
            .bearer_auth(password)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::unreachable(address, e))?;
        Self::accepted(address, &reply)?;
        reply
            .json()
            .await
            .map_err(|e| RelayError::bad_reply(address, e))
    }

    fn accepted(address: &str, reply: &reqwest::Response) -> Result<(), RelayError> {
        let status = reply.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RelayError::Refused {
                address: address.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
