//! In-memory backend used by unit tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::backend::{BackendPort, BackendResponse};
use crate::config::GatewayConfig;
use crate::error::GatewayError;

pub fn test_config() -> GatewayConfig {
    GatewayConfig::new(
        SocketAddr::from(([127, 0, 0, 1], 0)),
        "http://backend.test/v1",
        "test-model",
        Duration::from_secs(5),
    )
    .unwrap()
}

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// Scripted backend: answers calls in order and records each one.
#[derive(Debug, Default)]
pub struct FakeBackend {
    responses: Mutex<VecDeque<BackendResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
    fail_with_timeout: Option<bool>,
}

impl FakeBackend {
    pub fn with_responses<const N: usize>(responses: [(StatusCode, &'static str); N]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| BackendResponse::new(status, body))
                    .collect(),
            ),
            ..Self::default()
        })
    }

    /// Every call fails as a transport error.
    pub fn failing(timed_out: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_with_timeout: Some(timed_out),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, call: RecordedCall) -> Result<BackendResponse, GatewayError> {
        self.calls.lock().unwrap().push(call);

        if let Some(timed_out) = self.fail_with_timeout {
            return Err(GatewayError::Transport {
                timed_out,
                message: "simulated transport failure".to_string(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected backend call"))
    }
}

#[async_trait]
impl BackendPort for FakeBackend {
    async fn get(&self, path: &str) -> Result<BackendResponse, GatewayError> {
        self.answer(RecordedCall {
            method: "GET",
            path: path.to_string(),
            body: None,
        })
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<BackendResponse, GatewayError> {
        self.answer(RecordedCall {
            method: "POST",
            path: path.to_string(),
            body: Some(body.clone()),
        })
    }
}
