//! Backend port and its HTTP adapter.
//!
//! The gateway talks to the inference backend only through [`BackendPort`].
//! [`HttpBackend`] owns the process-wide connection pool; tests substitute an
//! in-memory implementation.

use std::fmt;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, error, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Raw backend answer: status code plus unparsed body.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True when the backend signalled that the endpoint does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Map the raw answer to a JSON value with the backend's status.
    ///
    /// A body that does not parse as JSON becomes [`GatewayError::Backend`]
    /// carrying the same status and the raw text.
    pub fn into_json(self) -> Result<(StatusCode, serde_json::Value), GatewayError> {
        match serde_json::from_slice(&self.body) {
            Ok(value) => Ok((self.status, value)),
            Err(e) => {
                let detail = String::from_utf8_lossy(&self.body).into_owned();
                warn!(
                    status = %self.status,
                    error = %e,
                    "Backend returned a non-JSON body"
                );
                Err(GatewayError::Backend {
                    status: self.status,
                    detail,
                })
            }
        }
    }
}

/// Port for issuing calls against the inference backend.
///
/// `path` is relative to the configured backend base URL (e.g. `/models`).
/// Implementations never retry; one call on the port is one outbound request.
#[async_trait]
pub trait BackendPort: Send + Sync + fmt::Debug {
    /// `GET {base}{path}`.
    async fn get(&self, path: &str) -> Result<BackendResponse, GatewayError>;

    /// `POST {base}{path}` with a JSON body.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<BackendResponse, GatewayError>;
}

/// reqwest-backed [`BackendPort`].
///
/// The inner `Client` is the single shared connection pool; cloning the
/// adapter shares it.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: GatewayConfig,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("backend_url", &self.config.backend_url())
            .field("timeout", &self.config.request_timeout())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    /// Build the connection pool. Every call is bounded by the configured timeout.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client, config })
    }

    async fn finish(
        &self,
        url: &str,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<BackendResponse, GatewayError> {
        let response = sent.map_err(|e| {
            error!(url = %url, timed_out = e.is_timeout(), "Failed to reach backend: {e}");
            GatewayError::from(e)
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);

        let body = response.bytes().await.map_err(|e| {
            error!(url = %url, status = %status, "Failed to read backend response: {e}");
            GatewayError::from(e)
        })?;

        debug!(url = %url, status = %status, bytes = body.len(), "Backend responded");
        Ok(BackendResponse { status, body })
    }
}

#[async_trait]
impl BackendPort for HttpBackend {
    async fn get(&self, path: &str) -> Result<BackendResponse, GatewayError> {
        let url = self.config.endpoint(path);
        debug!("Forwarding GET to {url}");
        let sent = self.client.get(&url).send().await;
        self.finish(&url, sent).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<BackendResponse, GatewayError> {
        let url = self.config.endpoint(path);
        debug!("Forwarding POST to {url}");
        let sent = self.client.post(&url).json(body).send().await;
        self.finish(&url, sent).await
    }
}
