//! CLI entry point - the composition root.
//!
//! This is the only place where the backend client, the gateway and the
//! listener are wired together.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use infergate_cli::{Cli, init_tracing};
use infergate_proxy::{Gateway, HttpBackend, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.to_config().context("Invalid gateway configuration")?;

    // One connection pool for the whole process lifetime
    let backend = HttpBackend::new(config.clone()).context("Failed to build backend client")?;
    let gateway = Gateway::new(Arc::new(backend), config.clone());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    serve(listener, gateway, cancel).await?;
    info!("Backend client released");
    Ok(())
}

/// Cancel `token` on Ctrl-C or (on Unix) SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received, draining in-flight requests");
    token.cancel();
}
