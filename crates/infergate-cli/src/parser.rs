//! Command-line and environment configuration.
//!
//! Every flag can also be supplied through the environment (a `.env` file is
//! loaded first by `main`).

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use infergate_proxy::config::{DEFAULT_BACKEND_URL, DEFAULT_MODEL_ID};
use infergate_proxy::{ConfigError, GatewayConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// OpenAI-compatible gateway for a completions-only inference backend.
#[derive(Debug, Parser)]
#[command(name = "infergate")]
#[command(version, about)]
pub struct Cli {
    /// Backend base URL, including the `/v1` suffix
    #[arg(long, env = "PREFILL_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Model identifier used when a request does not name one
    #[arg(long, env = "MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model: String,

    /// Address to listen on
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "GATEWAY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Timeout for each backend call, in seconds
    #[arg(long = "timeout-secs", env = "REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Validate the arguments into a gateway configuration.
    pub fn to_config(&self) -> Result<GatewayConfig, ConfigError> {
        GatewayConfig::new(
            SocketAddr::new(self.host, self.port),
            &self.backend_url,
            self.model.clone(),
            Duration::from_secs(self.timeout_secs),
        )
    }
}
