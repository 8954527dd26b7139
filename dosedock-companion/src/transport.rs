//! HTTP transport seam for the companion device.
//!
//! The client talks to the device through this trait so tests can script
//! responses without a device on the network.

use crate::error::{CompanionError, CompanionResult};
use async_trait::async_trait;
use std::time::Duration;

/// Per-request timeout for the device's tiny HTTP server.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Abstract transport to the companion device.
#[async_trait]
pub trait CompanionTransport: Send + Sync {
    /// Issues a GET and parses the response body as JSON.
    async fn get_json(&self, path: &str) -> CompanionResult<serde_json::Value>;

    /// Issues a POST with an empty body, discarding any response payload.
    async fn post_empty(&self, path: &str) -> CompanionResult<()>;
}

/// Production transport backed by reqwest.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport for the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> CompanionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CompanionError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The device base URL this transport targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CompanionTransport for HttpTransport {
    async fn get_json(&self, path: &str) -> CompanionResult<serde_json::Value> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| CompanionError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompanionError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| CompanionError::MalformedResponse(e.to_string()))
    }

    async fn post_empty(&self, path: &str) -> CompanionResult<()> {
        let response = self
            .client
            .post(self.url(path))
            .send()
            .await
            .map_err(|e| CompanionError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompanionError::Status(status.as_u16()));
        }
        Ok(())
    }
}
