//! Derived view model of the onboarding flow, recomputed from state.

use serde::Serialize;

use super::state::{OnboardingState, OnboardingStep};
use crate::api::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Done,
    Skipped,
}

/// What a step's button does; the view dispatches it to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateAccount,
    CreateConnection,
    SubmitInvite,
    SkipInvite,
    StartSync,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateAccount => "Create workspace",
            Self::CreateConnection => "Connect marketplace",
            Self::SubmitInvite => "Send invitation",
            Self::SkipInvite => "Skip for now",
            Self::StartSync => "Run first sync",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepAction {
    pub kind: ActionKind,
    pub label: &'static str,
    pub disabled: bool,
}

impl StepAction {
    fn new(kind: ActionKind, disabled: bool) -> Self {
        Self {
            kind,
            label: kind.label(),
            disabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: OnboardingStep,
    pub status: StepStatus,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<StepAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<StepAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only projection for rendering the getting-started checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub steps: Vec<StepView>,
    pub active: Option<OnboardingStep>,
    pub current_step: OnboardingStep,
    pub account_id: Option<AccountId>,
    pub connection_count: usize,
    pub invited_count: usize,
    pub is_processing: bool,
    pub completed: bool,
}

impl FlowState {
    pub fn derive(state: &OnboardingState) -> FlowState {
        let frontier = state.frontier();
        let active = (!frontier.is_terminal()).then_some(frontier);

        let steps = OnboardingStep::SEQUENCE
            .into_iter()
            .map(|step| step_view(state, step, active))
            .collect();

        FlowState {
            steps,
            active,
            current_step: state.current_step(),
            account_id: state.account_id,
            connection_count: state.connections.len(),
            invited_count: state.invited_members.len(),
            is_processing: state.is_processing,
            completed: state.completed,
        }
    }

    pub fn step(&self, step: OnboardingStep) -> Option<&StepView> {
        self.steps.iter().find(|v| v.step == step)
    }
}

fn step_view(state: &OnboardingState, step: OnboardingStep, active: Option<OnboardingStep>) -> StepView {
    let is_active = active == Some(step);
    let status = if step == OnboardingStep::Invite && state.invite_skipped && !state.invite_completed
    {
        StepStatus::Skipped
    } else if state.is_resolved(step) {
        StepStatus::Done
    } else if is_active {
        StepStatus::Active
    } else {
        StepStatus::Pending
    };

    let unresolved = matches!(status, StepStatus::Active | StepStatus::Pending);
    let locked = state.is_processing || !is_active;

    let primary = unresolved.then(|| {
        let kind = match step {
            OnboardingStep::Account => ActionKind::CreateAccount,
            OnboardingStep::Connection => ActionKind::CreateConnection,
            OnboardingStep::Invite => ActionKind::SubmitInvite,
            OnboardingStep::Sync | OnboardingStep::Done => ActionKind::StartSync,
        };
        let disabled = match kind {
            // Invitations only need a workspace; they can be sent before a connection exists.
            ActionKind::SubmitInvite => state.is_processing || !state.has_account(),
            ActionKind::StartSync => locked || !state.sync_ready() || state.has_successful_sync(),
            _ => locked,
        };
        StepAction::new(kind, disabled)
    });

    let secondary = (step == OnboardingStep::Invite && unresolved).then(|| {
        StepAction::new(
            ActionKind::SkipInvite,
            state.is_processing || !state.has_connections(),
        )
    });

    StepView {
        step,
        status,
        optional: step.is_optional(),
        primary,
        secondary,
        error: state.error_for(step).map(ToString::to_string),
    }
}
