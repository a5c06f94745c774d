//! End-to-end tests for the gateway.
//!
//! These tests start a fake inference backend on an ephemeral port and drive
//! the real gateway (reqwest adapter included) against it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use infergate_proxy::{Gateway, GatewayConfig, HttpBackend, create_router, serve};

/// Requests seen by the fake backend, in arrival order.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, Value)>>>);

impl Seen {
    fn push(&self, path: &str, body: Value) {
        self.0.lock().unwrap().push((path.to_string(), body));
    }

    fn all(&self) -> Vec<(String, Value)> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct BackendState {
    native_chat: bool,
    seen: Seen,
}

async fn backend_models(State(state): State<BackendState>) -> impl IntoResponse {
    state.seen.push("/v1/models", Value::Null);
    Json(json!({"object": "list", "data": [{"id": "fake-model", "object": "model"}]}))
}

async fn backend_completions(
    State(state): State<BackendState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.seen.push("/v1/completions", body.clone());
    Json(json!({
        "object": "text_completion",
        "model": body["model"],
        "choices": [{"index": 0, "text": "ok"}],
    }))
}

async fn backend_chat(
    State(state): State<BackendState>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    state.seen.push("/v1/chat/completions", body);
    if state.native_chat {
        Json(json!({"object": "chat.completion", "choices": []})).into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not Found").into_response()
    }
}

async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn start_backend(native_chat: bool) -> (SocketAddr, Seen) {
    let seen = Seen::default();
    let state = BackendState {
        native_chat,
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/v1/models", get(backend_models))
        .route("/v1/completions", post(backend_completions))
        .route("/v1/chat/completions", post(backend_chat))
        .with_state(state);
    (spawn_backend(router).await, seen)
}

fn gateway_for(addr: SocketAddr, timeout: Duration) -> Gateway {
    let config = GatewayConfig::new(
        SocketAddr::from(([127, 0, 0, 1], 0)),
        &format!("http://{addr}/v1"),
        "default-model",
        timeout,
    )
    .unwrap();
    let backend = HttpBackend::new(config.clone()).unwrap();
    Gateway::new(Arc::new(backend), config)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn models_are_relayed_from_backend() {
    let (addr, seen) = start_backend(false).await;
    let app = create_router(gateway_for(addr, Duration::from_secs(5)));

    let response = app.oneshot(get_req("/v1/models")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["data"][0]["id"], "fake-model");
    assert_eq!(seen.all().len(), 1);
}

#[tokio::test]
async fn generate_pins_default_model() {
    let (addr, seen) = start_backend(false).await;
    let app = create_router(gateway_for(addr, Duration::from_secs(5)));

    let response = app
        .oneshot(post_json(
            "/generate",
            &json!({"prompt": "hello", "temperature": 0.1}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["model"], "default-model");

    let seen = seen.all();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].1,
        json!({
            "model": "default-model",
            "prompt": "hello",
            "max_tokens": 128,
            "temperature": 0.1,
        })
    );
}

#[tokio::test]
async fn chat_falls_back_to_completions_when_backend_lacks_chat() {
    let (addr, seen) = start_backend(false).await;
    let app = create_router(gateway_for(addr, Duration::from_secs(5)));

    let body = json!({
        "messages": [
            {"role": "user", "content": "hi"},
            {"role": "user", "content": "there"},
        ],
        "stop": ["</s>"],
    });
    let response = app
        .oneshot(post_json("/v1/chat/completions", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["object"], "text_completion");

    let seen = seen.all();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "/v1/chat/completions");
    assert_eq!(seen[0].1, body);
    assert_eq!(seen[1].0, "/v1/completions");
    assert_eq!(seen[1].1["prompt"], "hi\nthere");
    assert_eq!(seen[1].1["model"], "default-model");
    assert_eq!(seen[1].1["stop"], json!(["</s>"]));
}

#[tokio::test]
async fn native_chat_is_used_when_available() {
    let (addr, seen) = start_backend(true).await;
    let app = create_router(gateway_for(addr, Duration::from_secs(5)));

    let response = app
        .oneshot(post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["object"], "chat.completion");
    assert_eq!(seen.all().len(), 1);
}

#[tokio::test]
async fn non_json_backend_error_keeps_status_and_text() {
    let router = Router::new().route(
        "/v1/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }),
    );
    let addr = spawn_backend(router).await;
    let app = create_router(gateway_for(addr, Duration::from_secs(5)));

    let response = app
        .oneshot(post_json("/v1/completions", &json!({"prompt": "x"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["detail"], "Internal Server Error");
    assert_eq!(body["type"], "backend_error");
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = create_router(gateway_for(addr, Duration::from_secs(5)));
    let response = app.oneshot(get_req("/v1/models")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(read_json(response).await["type"], "transport_error");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let router = Router::new().route(
        "/v1/models",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"data": []}))
        }),
    );
    let addr = spawn_backend(router).await;
    let app = create_router(gateway_for(addr, Duration::from_millis(200)));

    let response = app.oneshot(get_req("/v1/models")).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(read_json(response).await["type"], "transport_error");
}

#[tokio::test]
async fn serve_answers_until_cancelled() {
    let (backend_addr, _seen) = start_backend(false).await;
    let gateway = gateway_for(backend_addr, Duration::from_secs(5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(serve(listener, gateway, cancel.clone()));

    let client = reqwest::Client::new();
    let health: Value = client
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["ok"], true);
    assert_eq!(health["model"], "default-model");
    assert_eq!(health["backend_url"], format!("http://{backend_addr}/v1"));
    drop(client);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
