//! REST endpoints driving the onboarding flow for a browser front end.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use super::controller::{OnboardingController, StepOutcome};
use super::flow::FlowState;
use super::forms::{AccountForm, ConnectionForm, InviteForm};
use super::state::OnboardingState;
use crate::api::{ConnectionId, SyncStatusReport};
use crate::error::{ApiError, OnboardingError};
use crate::session::AuthGate;
use crate::sync_watch::{SyncObservation, SyncWatches};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub controller: Arc<OnboardingController>,
    pub auth: Arc<AuthGate>,
    pub sync_watches: Arc<SyncWatches>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: OnboardingState,
    pub flow: FlowState,
}

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub outcome: StepOutcome,
    pub flow: FlowState,
}

/// Progress of a connection's legacy sync as last polled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgressResponse {
    pub connection_id: ConnectionId,
    /// True until the start call has answered.
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncStatusReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl SyncProgressResponse {
    fn new(connection_id: ConnectionId, observation: SyncObservation) -> Self {
        let (report, error) = match observation {
            None => (None, None),
            Some(Ok(report)) => (Some(report), None),
            Some(Err(error)) => (None, Some(error)),
        };
        Self {
            connection_id,
            pending: report.is_none() && error.is_none(),
            report,
            error,
        }
    }
}

/// A failed step, rendered with the flow so the client can redraw inline errors.
pub struct StepFailure {
    error: OnboardingError,
    flow: FlowState,
}

impl IntoResponse for StepFailure {
    fn into_response(self) -> Response {
        let status = match self.error {
            OnboardingError::Api(api) => {
                return (StatusCode::BAD_GATEWAY, Json(api)).into_response();
            }
            OnboardingError::UnexpectedStatus { .. } => StatusCode::BAD_GATEWAY,
            OnboardingError::Validation { .. } | OnboardingError::Guard { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (
            status,
            Json(serde_json::json!({"error": self.error, "flow": self.flow})),
        )
            .into_response()
    }
}

type StepResult = Result<Json<StepResponse>, StepFailure>;

fn respond(controller: &OnboardingController, result: Result<StepOutcome, OnboardingError>) -> StepResult {
    let flow = controller.flow();
    match result {
        Ok(outcome) => Ok(Json(StepResponse { outcome, flow })),
        Err(error) => Err(StepFailure { error, flow }),
    }
}

/// Rejects every request while the session gate is closed.
async fn require_session(
    State(state): State<OnboardingRouteState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.auth.is_authenticated() {
        debug!(path = %request.uri().path(), "Rejecting request without session");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Not authenticated"})),
        )
            .into_response();
    }
    next.run(request).await
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let controller = &state.controller;
    Json(StatusResponse {
        state: controller.snapshot(),
        flow: controller.flow(),
    })
}

/// POST /api/onboarding/account
async fn create_account(
    State(state): State<OnboardingRouteState>,
    Json(form): Json<AccountForm>,
) -> StepResult {
    let result = state.controller.create_account(&form).await;
    respond(&state.controller, result)
}

/// POST /api/onboarding/connection
async fn create_connection(
    State(state): State<OnboardingRouteState>,
    Json(form): Json<ConnectionForm>,
) -> StepResult {
    let result = state.controller.create_connection(&form).await;
    respond(&state.controller, result)
}

/// POST /api/onboarding/invite
async fn submit_invite(
    State(state): State<OnboardingRouteState>,
    Json(form): Json<InviteForm>,
) -> StepResult {
    let result = state.controller.submit_invite(&form).await;
    respond(&state.controller, result)
}

/// POST /api/onboarding/invite/skip
async fn skip_invite(State(state): State<OnboardingRouteState>) -> StepResult {
    let result = state.controller.skip_invite();
    respond(&state.controller, result)
}

/// POST /api/onboarding/sync
async fn start_sync(State(state): State<OnboardingRouteState>) -> StepResult {
    let result = state.controller.start_sync().await;
    respond(&state.controller, result)
}

/// POST /api/onboarding/finish
async fn finish(State(state): State<OnboardingRouteState>) -> StepResult {
    let outcome = state.controller.finish().await;
    if outcome == StepOutcome::Applied {
        state.sync_watches.stop_all().await;
    }
    respond(&state.controller, Ok(outcome))
}

/// GET /api/onboarding/connections/{id}/sync
///
/// The first request starts the connection's sync; later ones return the
/// latest polled status.
async fn sync_progress(
    State(state): State<OnboardingRouteState>,
    Path(connection_id): Path<ConnectionId>,
) -> Json<SyncProgressResponse> {
    let observation = state.sync_watches.observe(connection_id).await;
    Json(SyncProgressResponse::new(connection_id, observation))
}

/// DELETE /api/onboarding/connections/{id}/sync
async fn stop_sync_progress(
    State(state): State<OnboardingRouteState>,
    Path(connection_id): Path<ConnectionId>,
) -> StatusCode {
    if state.sync_watches.stop(connection_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "datapulse-onboarding"
    }))
}

/// Build the onboarding REST routes. `/health` stays reachable without a session.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    let gated = Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/account", post(create_account))
        .route("/api/onboarding/connection", post(create_connection))
        .route("/api/onboarding/invite", post(submit_invite))
        .route("/api/onboarding/invite/skip", post(skip_invite))
        .route("/api/onboarding/sync", post(start_sync))
        .route("/api/onboarding/finish", post(finish))
        .route(
            "/api/onboarding/connections/{id}/sync",
            get(sync_progress).delete(stop_sync_progress),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
        .with_state(state);

    Router::new().route("/health", get(health)).merge(gated)
}
