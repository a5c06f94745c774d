//! Axum HTTP server for the gateway.
//!
//! This module provides the router and the `serve()` function that runs it
//! on a pre-bound `TcpListener` until the cancellation token fires.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::gateway::{Gateway, Relayed};

/// Build the router with every inbound route.
///
/// Inbound bodies are not size-capped; long prompts are forwarded whole.
pub fn create_router(gateway: Gateway) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/models", get(list_models))
        .route("/generate", post(generate))
        .route("/v1/completions", post(completions))
        .route("/v1/chat/completions", post(chat_completions))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Start the gateway with a pre-bound listener.
///
/// Runs until `cancel` is triggered, then waits for in-flight requests to
/// finish. The gateway (and with it the backend connection pool) is dropped
/// when this returns.
///
/// # Arguments
///
/// * `listener` - Already-bound TCP listener
/// * `gateway` - Gateway handle shared by every handler
/// * `cancel` - Token that triggers graceful shutdown
///
/// # Returns
///
/// `Ok(())` once the server has drained after cancellation.
pub async fn serve(
    listener: TcpListener,
    gateway: Gateway,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        backend = %gateway.config().backend_url(),
        model = %gateway.config().default_model(),
        "Gateway listening on {addr}"
    );

    let app = create_router(gateway);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Gateway shut down");
    Ok(())
}

/// Liveness probe; never calls the backend.
async fn healthz(State(gateway): State<Gateway>) -> impl IntoResponse {
    Json(gateway.health())
}

async fn list_models(State(gateway): State<Gateway>) -> Result<Response, GatewayError> {
    debug!("GET /v1/models");
    gateway.list_models().await.map(relay)
}

async fn generate(State(gateway): State<Gateway>, body: Bytes) -> Result<Response, GatewayError> {
    debug!("POST /generate");
    gateway.generate(parse_object(&body)?).await.map(relay)
}

async fn completions(
    State(gateway): State<Gateway>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    debug!("POST /v1/completions");
    gateway.completions(parse_object(&body)?).await.map(relay)
}

async fn chat_completions(
    State(gateway): State<Gateway>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    debug!("POST /v1/chat/completions");
    gateway.chat_completions(parse_object(&body)?).await.map(relay)
}

/// Inbound bodies must be JSON objects; anything else is a 400.
fn parse_object(body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GatewayError::bad_request("Request body must be a JSON object.")),
        Err(e) => Err(GatewayError::bad_request(format!("Invalid JSON body: {e}"))),
    }
}

fn relay((status, value): Relayed) -> Response {
    (status, Json(value)).into_response()
}
