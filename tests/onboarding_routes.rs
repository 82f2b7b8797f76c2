//! Integration tests for the onboarding REST routes.
//!
//! Each test spins up the mock backend and the onboarding router on random
//! ports and drives the flow through real HTTP requests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::time::timeout;

use common::{Backend, TAKEN_NAME, TEST_TIMEOUT, client, serve, start_backend};
use datapulse::onboarding::{
    OnboardingController, OnboardingRouteState, PreferenceNavigator, StateStore, TracingNotifier,
    onboarding_routes,
};
use datapulse::preferences::Preferences;
use datapulse::session::AuthGate;
use datapulse::sync_watch::SyncWatches;

struct Harness {
    base: String,
    backend: Arc<Backend>,
    auth: Arc<AuthGate>,
    preferences: Preferences,
    http: reqwest::Client,
}

impl Harness {
    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.http
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }
}

/// Start backend + onboarding server with an open session gate.
async fn start() -> Harness {
    let (backend_url, backend) = start_backend().await;
    let preferences = Preferences::in_memory();
    let api = Arc::new(client(&backend_url));
    let controller = Arc::new(OnboardingController::new(
        api.clone(),
        StateStore::new(),
        Arc::new(PreferenceNavigator::new(preferences.clone())),
        Arc::new(TracingNotifier),
        preferences.clone(),
    ));
    let auth = Arc::new(AuthGate::new());
    auth.set(true);

    let app = onboarding_routes(OnboardingRouteState {
        controller,
        auth: Arc::clone(&auth),
        sync_watches: Arc::new(SyncWatches::new(api, Duration::from_millis(20))),
    });
    let port = serve(app).await;

    Harness {
        base: format!("http://127.0.0.1:{port}"),
        backend,
        auth,
        preferences,
        http: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn health_needs_no_session() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;
        h.auth.set(false);

        let (status, body) = h.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn closed_gate_answers_401() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;
        h.auth.set(false);

        let (status, _) = h.get("/api/onboarding/status").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = h.post("/api/onboarding/account", json!({"name": "Acme"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(h.backend.requests_to("/api/accounts").is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn status_reports_fresh_flow() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;

        let (status, body) = h.get("/api/onboarding/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flow"]["currentStep"], "account");
        assert_eq!(body["flow"]["active"], "account");
        assert_eq!(body["flow"]["steps"].as_array().unwrap().len(), 4);
        assert_eq!(body["state"]["isProcessing"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn validation_and_guard_errors_answer_422() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;

        let (status, body) = h.post("/api/onboarding/account", json!({"name": "  "})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["kind"], "validation");
        assert_eq!(body["flow"]["steps"][0]["error"], "Workspace name is required");

        let (status, body) = h.post("/api/onboarding/sync", json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["kind"], "guard");

        assert!(h.backend.requests.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn backend_failure_answers_502_with_api_error() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;

        let (status, body) = h
            .post("/api/onboarding/account", json!({"name": TAKEN_NAME}))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], 409);
        assert_eq!(body["message"], "Name already taken");
        assert_eq!(body["correlationId"], "corr-1");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_flow_through_routes() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;

        let (status, body) = h.post("/api/onboarding/account", json!({"name": "Acme"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");
        assert_eq!(body["flow"]["accountId"], 11);
        assert_eq!(body["flow"]["currentStep"], "connection");

        let (status, body) = h
            .post(
                "/api/onboarding/connection",
                json!({"marketplace": "WILDBERRIES", "token": "abc"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flow"]["connectionCount"], 1);
        assert_eq!(body["flow"]["currentStep"], "invite");

        let (status, body) = h
            .post(
                "/api/onboarding/invite",
                json!({"email": "ops@acme.io", "role": "OPERATOR"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flow"]["invitedCount"], 1);

        let (status, body) = h.post("/api/onboarding/invite/skip", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "ignored");

        let (status, body) = h.post("/api/onboarding/sync", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flow"]["completed"], true);
        assert_eq!(body["flow"]["currentStep"], "done");
        assert_eq!(
            h.preferences.last_path(11).await.as_deref(),
            Some("/accounts/11/overview")
        );

        let (status, body) = h.post("/api/onboarding/finish", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flow"]["currentStep"], "account");
        assert!(body["flow"]["accountId"].is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sync_progress_starts_once_and_polls() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;
        let path = "/api/onboarding/connections/5/sync";

        let (status, body) = h.get(path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connectionId"], 5);

        let mut polled = body;
        while polled["report"]["status"] != "RUNNING" {
            tokio::time::sleep(Duration::from_millis(20)).await;
            polled = h.get(path).await.1;
        }
        assert_eq!(polled["pending"], false);
        assert!(polled.get("error").is_none());
        assert_eq!(
            h.backend
                .requests_to("/api/account-connections/5/sync/start")
                .len(),
            1
        );

        assert_eq!(h.delete(path).await, StatusCode::NO_CONTENT);
        assert_eq!(h.delete(path).await, StatusCode::NOT_FOUND);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sync_progress_needs_a_session() {
    timeout(TEST_TIMEOUT, async {
        let h = start().await;
        h.auth.set(false);

        let (status, _) = h.get("/api/onboarding/connections/5/sync").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(
            h.backend
                .requests_to("/api/account-connections/5/sync/start")
                .is_empty()
        );
    })
    .await
    .expect("test timed out");
}
