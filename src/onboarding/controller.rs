//! OnboardingController: drives a new workspace through the getting-started
//! steps and enforces step gating.
//!
//! Every operation is independent: it checks the processing flag, validates
//! locally, issues at most one mutation, and records its own failure in the
//! step's error slot. A failure never resets a step that already completed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::effects::{Navigator, Notifier, Toast};
use super::flow::FlowState;
use super::forms::{AccountForm, ConnectionForm, InviteForm};
use super::state::{OnboardingState, OnboardingStep, StateStore};
use crate::api::{AccountId, Connection, DataPulseApi, NewConnection};
use crate::error::{OnboardingError, StepError};
use crate::etl::{ScenarioRunRequest, is_accepted};
use crate::preferences::Preferences;

/// What an operation did when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The operation ran and updated state.
    Applied,
    /// Another mutation was in flight, or there was nothing to do.
    Ignored,
}

/// Coordinates the onboarding flow over the workspace, connection, member and
/// ETL collaborators.
pub struct OnboardingController {
    api: Arc<dyn DataPulseApi>,
    store: StateStore,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    preferences: Preferences,
}

impl OnboardingController {
    pub fn new(
        api: Arc<dyn DataPulseApi>,
        store: StateStore,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        preferences: Preferences,
    ) -> Self {
        Self {
            api,
            store,
            navigator,
            notifier,
            preferences,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn snapshot(&self) -> OnboardingState {
        self.store.snapshot()
    }

    pub fn flow(&self) -> FlowState {
        self.store.flow()
    }

    /// Create the workspace and make it the current one.
    pub async fn create_account(&self, form: &AccountForm) -> Result<StepOutcome, OnboardingError> {
        if self.busy("create_account") {
            return Ok(StepOutcome::Ignored);
        }
        let body = form
            .validate()
            .map_err(|e| self.fail_step(OnboardingStep::Account, e))?;

        let Some(_guard) = self.store.try_begin_processing() else {
            return Ok(StepOutcome::Ignored);
        };
        self.clear_step_error(OnboardingStep::Account);

        match self.api.create_account(&body).await {
            Ok(account) => {
                info!(account_id = account.id, name = %account.name, "Workspace created");
                self.store.patch(|s| {
                    s.switch_workspace(account.id, account.name.clone());
                    s.advance_display();
                });
                self.preferences.set_last_account_id(account.id).await;
                self.preferences.set_onboarding_active(true).await;
                self.notifier
                    .notify(Toast::success(format!("Workspace \"{}\" created", account.name)));
                Ok(StepOutcome::Applied)
            }
            Err(e) => Err(self.fail_step(OnboardingStep::Account, e.into())),
        }
    }

    /// Attach a marketplace connection to the current workspace.
    pub async fn create_connection(
        &self,
        form: &ConnectionForm,
    ) -> Result<StepOutcome, OnboardingError> {
        if self.busy("create_connection") {
            return Ok(StepOutcome::Ignored);
        }
        let Some(account_id) = self.store.read(|s| s.account_id) else {
            return Err(self.fail_step(
                OnboardingStep::Connection,
                OnboardingError::validation("Create a workspace before adding a connection"),
            ));
        };
        let credentials = form
            .credentials()
            .map_err(|e| self.fail_step(OnboardingStep::Connection, e))?;

        let Some(_guard) = self.store.try_begin_processing() else {
            return Ok(StepOutcome::Ignored);
        };
        self.clear_step_error(OnboardingStep::Connection);

        let body = NewConnection::new(credentials);
        let marketplace = body.marketplace();
        let created = match self.api.create_connection(account_id, &body).await {
            Ok(created) => created,
            Err(e) => {
                self.notifier.notify(Toast::error(format!(
                    "Could not connect {}: {}",
                    marketplace.display_name(),
                    e.message
                )));
                return Err(self.fail_step(OnboardingStep::Connection, e.into()));
            }
        };
        info!(
            account_id,
            connection_id = created.id,
            marketplace = %marketplace,
            "Connection created"
        );

        let connections = match self.api.list_connections(account_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!(account_id, "Failed to refresh connections after create: {e}");
                self.store.read(|s| s.connections.clone())
            }
        };
        let connections = with_connection(connections, created);

        self.store.patch(|s| {
            if s.account_id == Some(account_id) {
                s.connections = connections;
                s.advance_display();
            }
        });
        self.notifier.notify(Toast::success(format!(
            "{} connection created",
            marketplace.display_name()
        )));
        Ok(StepOutcome::Applied)
    }

    /// Skip the optional invitation step. No network call.
    pub fn skip_invite(&self) -> Result<StepOutcome, OnboardingError> {
        let (processing, has_connections, resolved) = self
            .store
            .read(|s| (s.is_processing, s.has_connections(), s.is_invite_resolved()));
        if processing {
            debug!("skip_invite ignored while a request is in flight");
            return Ok(StepOutcome::Ignored);
        }
        if !has_connections {
            return Err(self.fail_step(
                OnboardingStep::Invite,
                OnboardingError::guard("Add a marketplace connection before skipping invitations"),
            ));
        }
        if resolved {
            return Ok(StepOutcome::Ignored);
        }

        self.store.patch(|s| {
            s.invite_skipped = true;
            if s.general_error.as_ref().is_some_and(|e| e.step == OnboardingStep::Invite) {
                s.general_error = None;
            }
            s.advance_display();
        });
        info!("Invitation step skipped");
        Ok(StepOutcome::Applied)
    }

    /// Invite a teammate into the current workspace.
    pub async fn submit_invite(&self, form: &InviteForm) -> Result<StepOutcome, OnboardingError> {
        if self.busy("submit_invite") {
            return Ok(StepOutcome::Ignored);
        }
        let (account_id, invited) = self
            .store
            .read(|s| (s.account_id, s.invited_members.clone()));
        let Some(account_id) = account_id else {
            return Err(self.fail_step(
                OnboardingStep::Invite,
                OnboardingError::validation("Create a workspace before inviting teammates"),
            ));
        };
        let body = form
            .validate(&invited)
            .map_err(|e| self.fail_step(OnboardingStep::Invite, e))?;

        let Some(_guard) = self.store.try_begin_processing() else {
            return Ok(StepOutcome::Ignored);
        };
        self.clear_step_error(OnboardingStep::Invite);

        match self.api.create_member(account_id, &body).await {
            Ok(member) => {
                info!(account_id, member_id = member.id, role = ?member.role, "Teammate invited");
                let email = member.email.clone();
                self.store.patch(|s| {
                    s.invited_members.push(member);
                    s.invite_completed = true;
                    s.invite_skipped = false;
                    s.advance_display();
                });
                self.notifier
                    .notify(Toast::success(format!("Invitation sent to {email}")));
                Ok(StepOutcome::Applied)
            }
            Err(e) => {
                self.notifier.notify(Toast::error(format!(
                    "Could not invite {}: {}",
                    body.email, e.message
                )));
                Err(self.fail_step(OnboardingStep::Invite, e.into()))
            }
        }
    }

    /// Fire the first ETL synchronization and hand off to the overview.
    pub async fn start_sync(&self) -> Result<StepOutcome, OnboardingError> {
        let account_id = self
            .store
            .read(sync_guard)
            .map_err(|e| self.fail_sync(e))?;

        let Some(_guard) = self.store.try_begin_processing() else {
            return Err(self.fail_sync(OnboardingError::guard(
                "Another request is still in progress",
            )));
        };
        self.store.patch(|s| s.sync_error = None);

        let request = ScenarioRunRequest::first_sync(account_id);
        info!(
            account_id,
            events = request.events.len(),
            "Triggering first synchronization"
        );

        match self.api.run_etl_scenario(&request).await {
            Ok(status) if is_accepted(status) => {
                info!(account_id, status, "First synchronization accepted");
                self.store.patch(|s| {
                    s.completed = true;
                    s.sync_error = None;
                    s.advance_display();
                });
                self.preferences.set_onboarding_active(false).await;
                self.navigator.open_overview(account_id).await;
                Ok(StepOutcome::Applied)
            }
            Ok(status) => Err(self.fail_sync(OnboardingError::UnexpectedStatus { status })),
            Err(e) => Err(self.fail_sync(e.into())),
        }
    }

    /// Rehydrate onboarding for an existing workspace, discovering its
    /// connections.
    ///
    /// The workspace and its connections are both loaded before anything is
    /// stored, so a failed resume leaves the current state untouched.
    pub async fn resume(&self, account_id: AccountId) -> Result<StepOutcome, OnboardingError> {
        if self.busy("resume") {
            return Ok(StepOutcome::Ignored);
        }
        let Some(_guard) = self.store.try_begin_processing() else {
            return Ok(StepOutcome::Ignored);
        };

        let account = self
            .api
            .get_account(account_id)
            .await
            .map_err(|e| self.fail_step(OnboardingStep::Account, e.into()))?;
        let connections = self
            .api
            .list_connections(account.id)
            .await
            .map_err(|e| self.fail_step(OnboardingStep::Connection, e.into()))?;
        info!(
            account_id,
            connections = connections.len(),
            "Onboarding resumed"
        );

        self.store.patch(|s| {
            if s.account_id != Some(account.id) {
                s.switch_workspace(account.id, account.name.clone());
            } else {
                s.account_name = Some(account.name.clone());
            }
            s.connections = connections;
            s.general_error = None;
            s.advance_display();
        });
        self.preferences.set_last_account_id(account.id).await;
        self.preferences.set_onboarding_active(true).await;
        Ok(StepOutcome::Applied)
    }

    /// Re-read the connection list of the current workspace.
    pub async fn refresh_connections(&self) -> Result<StepOutcome, OnboardingError> {
        if self.busy("refresh_connections") {
            return Ok(StepOutcome::Ignored);
        }
        let Some(account_id) = self.store.read(|s| s.account_id) else {
            return Ok(StepOutcome::Ignored);
        };
        let Some(_guard) = self.store.try_begin_processing() else {
            return Ok(StepOutcome::Ignored);
        };

        let connections = self
            .api
            .list_connections(account_id)
            .await
            .map_err(|e| self.fail_step(OnboardingStep::Connection, e.into()))?;
        self.store.patch(|s| {
            if s.account_id == Some(account_id) {
                s.connections = connections;
                s.advance_display();
            }
        });
        Ok(StepOutcome::Applied)
    }

    /// Discard onboarding state once the user is done with it.
    ///
    /// Ignored while a request is in flight so its result cannot land in the
    /// fresh state.
    pub async fn finish(&self) -> StepOutcome {
        if self.busy("finish") {
            return StepOutcome::Ignored;
        }
        self.store.reset();
        self.preferences.set_onboarding_active(false).await;
        info!("Onboarding state discarded");
        StepOutcome::Applied
    }

    fn busy(&self, operation: &str) -> bool {
        let busy = self.store.is_processing();
        if busy {
            debug!(operation, "Ignored while a request is in flight");
        }
        busy
    }

    fn fail_step(&self, step: OnboardingStep, error: OnboardingError) -> OnboardingError {
        warn!(step = %step, local = error.is_local(), "Onboarding step failed: {error}");
        let stored = error.clone();
        self.store.patch(|s| {
            s.general_error = Some(StepError {
                step,
                error: stored,
            });
        });
        error
    }

    fn fail_sync(&self, error: OnboardingError) -> OnboardingError {
        warn!(local = error.is_local(), "First synchronization failed: {error}");
        let stored = error.clone();
        self.store.patch(|s| s.sync_error = Some(stored));
        error
    }

    fn clear_step_error(&self, step: OnboardingStep) {
        self.store.patch(|s| {
            if s.general_error.as_ref().is_some_and(|e| e.step == step) {
                s.general_error = None;
            }
        });
    }
}

/// Prerequisites of the first sync, checked without touching the network.
fn sync_guard(state: &OnboardingState) -> Result<AccountId, OnboardingError> {
    if state.completed {
        return Err(OnboardingError::guard("Onboarding is already complete"));
    }
    let Some(account_id) = state.account_id else {
        return Err(OnboardingError::guard("Create a workspace first"));
    };
    if state.connections.is_empty() {
        return Err(OnboardingError::guard(
            "Add at least one marketplace connection first",
        ));
    }
    if !state.is_invite_resolved() {
        return Err(OnboardingError::guard(
            "Invite a teammate or skip this step first",
        ));
    }
    if state.has_successful_sync() {
        return Err(OnboardingError::guard(
            "Data has already been synchronized for this workspace",
        ));
    }
    if state.is_processing {
        return Err(OnboardingError::guard("Another request is still in progress"));
    }
    Ok(account_id)
}

/// Make sure the freshly created connection is part of the list.
fn with_connection(mut connections: Vec<Connection>, created: Connection) -> Vec<Connection> {
    if !connections.iter().any(|c| c.id == created.id) {
        connections.push(created);
    }
    connections
}
