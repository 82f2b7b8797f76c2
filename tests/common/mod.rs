//! In-process stand-in for the DataPulse backend, served by Axum on a random port.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use datapulse::api::HttpApiClient;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The account name the backend refuses with a 409.
pub const TAKEN_NAME: &str = "Taken";
/// The account id the backend answers with a plain-text 404.
pub const MISSING_ACCOUNT: i64 = 999;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
    pub request_id: Option<String>,
    pub authorization: Option<String>,
}

pub struct Backend {
    pub requests: Mutex<Vec<Recorded>>,
    connections: Mutex<Vec<Value>>,
    next_connection_id: AtomicI64,
    etl_status: Mutex<u16>,
    authenticated: AtomicBool,
}

impl Backend {
    pub fn set_etl_status(&self, status: u16) {
        *self.etl_status.lock().unwrap() = status;
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn record(&self, method: &'static str, path: String, headers: &HeaderMap, body: Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            body,
            request_id: header("x-request-id"),
            authorization: header("authorization"),
        });
    }
}

type Shared = Arc<Backend>;

async fn auth(State(backend): State<Shared>) -> StatusCode {
    if backend.authenticated.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn create_account(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    backend.record("POST", "/api/accounts".into(), &headers, body.clone());
    if body["name"] == TAKEN_NAME {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Name already taken", "correlationId": "corr-1"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 11,
            "name": body["name"],
            "active": true,
            "createdAt": "2026-01-01T00:00:00Z"
        })),
    )
}

async fn get_account(Path(id): Path<i64>) -> impl IntoResponse {
    if id == MISSING_ACCOUNT {
        return (
            StatusCode::NOT_FOUND,
            [("x-correlation-id", "hdr-404")],
            "no such account".to_string(),
        )
            .into_response();
    }
    Json(json!({"id": id, "name": "Acme", "active": true})).into_response()
}

async fn list_connections(State(backend): State<Shared>, Path(id): Path<i64>) -> Json<Value> {
    let connections: Vec<Value> = backend
        .connections
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c["accountId"] == id)
        .cloned()
        .collect();
    Json(Value::Array(connections))
}

async fn create_connection(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    backend.record(
        "POST",
        format!("/api/accounts/{id}/connections"),
        &headers,
        body.clone(),
    );
    let created = json!({
        "id": backend.next_connection_id.fetch_add(1, Ordering::SeqCst),
        "accountId": id,
        "marketplace": body["marketplace"],
        "active": true,
        "lastSyncStatus": null
    });
    backend.connections.lock().unwrap().push(created.clone());
    (StatusCode::CREATED, Json(created))
}

async fn create_member(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    backend.record("POST", format!("/api/accounts/{id}/members"), &headers, body.clone());
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 31,
            "accountId": id,
            "email": body["email"],
            "role": body["role"],
            "status": body["status"],
            "accessScope": body["accessScope"]
        })),
    )
}

async fn run_scenario(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    backend.record("POST", "/api/etl/scenario/run".into(), &headers, body);
    let status = *backend.etl_status.lock().unwrap();
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn start_sync(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Json<Value> {
    backend.record(
        "POST",
        format!("/api/account-connections/{id}/sync/start"),
        &headers,
        Value::Null,
    );
    Json(json!({"status": "QUEUED", "message": "Sync queued"}))
}

async fn sync_status(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Json<Value> {
    backend.record(
        "GET",
        format!("/api/account-connections/{id}/sync/status"),
        &headers,
        Value::Null,
    );
    Json(json!({"status": "RUNNING"}))
}

/// Serve `router` on a random local port and return the port.
pub async fn serve(router: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;
    port
}

/// Start the mock backend, return (base url, backend).
pub async fn start_backend() -> (String, Shared) {
    let backend = Arc::new(Backend {
        requests: Mutex::new(Vec::new()),
        connections: Mutex::new(Vec::new()),
        next_connection_id: AtomicI64::new(5),
        etl_status: Mutex::new(202),
        authenticated: AtomicBool::new(true),
    });

    let app = Router::new()
        .route("/oauth2/auth", get(auth))
        .route("/api/accounts", post(create_account))
        .route("/api/accounts/{id}", get(get_account))
        .route(
            "/api/accounts/{id}/connections",
            get(list_connections).post(create_connection),
        )
        .route("/api/accounts/{id}/members", post(create_member))
        .route("/api/etl/scenario/run", post(run_scenario))
        .route("/api/account-connections/{id}/sync/start", post(start_sync))
        .route("/api/account-connections/{id}/sync/status", get(sync_status))
        .with_state(Arc::clone(&backend));

    let port = serve(app).await;
    (format!("http://127.0.0.1:{port}"), backend)
}

pub fn client(base_url: &str) -> HttpApiClient {
    HttpApiClient::new(base_url, None, Duration::from_secs(2)).unwrap()
}
