//! Gateway configuration.
//!
//! Read once at startup and shared read-only by every handler.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend base URL (a completions-only service, `/v1` suffix included).
pub const DEFAULT_BACKEND_URL: &str = "http://prefill:8010/v1";

/// Default model identifier assumed to be served by the backend.
pub const DEFAULT_MODEL_ID: &str = "Qwen/Qwen2.5-1.5B-Instruct";

/// Default bound on every outbound backend call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Backend URL could not be parsed.
    #[error("Invalid backend URL '{url}': {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    /// Backend URL uses a scheme other than http/https.
    #[error("Unsupported backend URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    /// Default model identifier is blank.
    #[error("Default model identifier must not be empty")]
    EmptyModel,

    /// Outbound timeout of zero.
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Immutable gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the inbound HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Backend base URL without a trailing slash (e.g. `http://host:8010/v1`).
    backend_url: String,
    /// Model identifier used when a request does not name one.
    default_model: String,
    /// Bound on each outbound call.
    request_timeout: Duration,
}

impl GatewayConfig {
    /// Build and validate a configuration.
    pub fn new(
        listen_addr: SocketAddr,
        backend_url: &str,
        default_model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let backend_url = normalize_backend_url(backend_url)?;

        let default_model = default_model.into();
        if default_model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        if request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            listen_addr,
            backend_url,
            default_model,
            request_timeout,
        })
    }

    /// Configuration with every default applied.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(
            SocketAddr::from(([0, 0, 0, 0], 8000)),
            DEFAULT_BACKEND_URL,
            DEFAULT_MODEL_ID,
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    /// Backend base URL, trailing slash removed.
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Model used by `/generate` and by chat requests without a `model`.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Bound applied to each outbound backend call.
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Full backend URL for `path` (which must start with `/`).
    ///
    /// The base already carries the `/v1` prefix, so `/models` resolves to
    /// `{base}/models`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_url, path.trim_start_matches('/'))
    }
}

/// Parse and validate a backend base URL, dropping any trailing slash.
fn normalize_backend_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBackendUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
