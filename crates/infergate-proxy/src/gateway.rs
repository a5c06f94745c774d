//! Request translation and the chat → completions fallback.
//!
//! Each operation issues exactly one backend call, except chat which may
//! issue a second, strictly after the first completes, when the backend
//! answers the native chat path with 404.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::backend::BackendPort;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::{ChatRequest, CompletionRequest, GenerateRequest, HealthResponse};

const MODELS_PATH: &str = "/models";
const COMPLETIONS_PATH: &str = "/completions";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Backend status plus JSON body, ready to be relayed to the caller.
pub type Relayed = (StatusCode, Value);

/// The gateway: configuration plus the shared backend handle.
///
/// Cheap to clone; every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct Gateway {
    backend: Arc<dyn BackendPort>,
    config: Arc<GatewayConfig>,
}

impl Gateway {
    pub fn new(backend: Arc<dyn BackendPort>, config: GatewayConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Liveness payload. Never touches the backend.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            ok: true,
            backend_url: self.config.backend_url().to_string(),
            model: self.config.default_model().to_string(),
        }
    }

    /// Relay the backend's model list.
    pub async fn list_models(&self) -> Result<Relayed, GatewayError> {
        self.backend.get(MODELS_PATH).await?.into_json()
    }

    /// Forward a completions body to the backend as-is.
    pub async fn completions(&self, body: Map<String, Value>) -> Result<Relayed, GatewayError> {
        self.send_completions(&Value::Object(body)).await
    }

    /// Prompt-only convenience route, pinned to the default model.
    pub async fn generate(&self, body: Map<String, Value>) -> Result<Relayed, GatewayError> {
        let request: GenerateRequest = serde_json::from_value(Value::Object(body))
            .map_err(|e| GatewayError::bad_request(format!("Invalid generate request: {e}")))?;

        let prompt = request
            .prompt
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GatewayError::bad_request("Missing 'prompt'."))?;

        let payload = CompletionRequest::new(self.config.default_model(), prompt, request.params);
        self.send_completion_request(&payload).await
    }

    /// Native chat passthrough, falling back to completions on 404.
    ///
    /// `messages` is validated before any backend call so an unusable
    /// request never reaches the backend.
    pub async fn chat_completions(
        &self,
        body: Map<String, Value>,
    ) -> Result<Relayed, GatewayError> {
        match body.get("messages") {
            None | Some(Value::Null) => {
                return Err(GatewayError::bad_request("Missing 'messages'."));
            }
            Some(Value::Array(messages)) if messages.is_empty() => {
                return Err(GatewayError::bad_request("Missing 'messages'."));
            }
            Some(Value::Array(_)) => {}
            Some(_) => return Err(GatewayError::bad_request("'messages' must be an array.")),
        }

        let body = Value::Object(body);
        let direct = self.backend.post_json(CHAT_COMPLETIONS_PATH, &body).await?;
        if !direct.is_not_found() {
            return direct.into_json();
        }

        let request: ChatRequest = serde_json::from_value(body)
            .map_err(|e| GatewayError::bad_request(format!("Invalid chat request: {e}")))?;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model().to_string());
        info!(
            model = %model,
            messages = request.messages.len(),
            "Backend has no native chat endpoint, falling back to completions"
        );

        let payload = CompletionRequest::new(model, request.flatten_prompt(), request.params);
        self.send_completion_request(&payload).await
    }

    async fn send_completion_request(
        &self,
        payload: &CompletionRequest,
    ) -> Result<Relayed, GatewayError> {
        let body = serde_json::to_value(payload).map_err(|e| {
            GatewayError::bad_request(format!("Unserializable completion request: {e}"))
        })?;
        self.send_completions(&body).await
    }

    async fn send_completions(&self, body: &Value) -> Result<Relayed, GatewayError> {
        debug!(model = ?body.get("model"), "Dispatching completions request");
        self.backend
            .post_json(COMPLETIONS_PATH, body)
            .await?
            .into_json()
    }
}
