//! Onboarding state machine: which step the workspace setup is in.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::flow::FlowState;
use crate::api::{AccountId, Connection, Member};
use crate::error::{OnboardingError, StepError};

/// The steps of the getting-started flow.
///
/// Progresses linearly: Account → Connection → Invite → Sync → Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Account,
    Connection,
    Invite,
    Sync,
    Done,
}

impl OnboardingStep {
    /// The actionable steps, in order.
    pub const SEQUENCE: [OnboardingStep; 4] = [
        OnboardingStep::Account,
        OnboardingStep::Connection,
        OnboardingStep::Invite,
        OnboardingStep::Sync,
    ];

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Account, Connection) | (Connection, Invite) | (Invite, Sync) | (Sync, Done)
        )
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Account => Some(Connection),
            Connection => Some(Invite),
            Invite => Some(Sync),
            Sync => Some(Done),
            Done => None,
        }
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Only the invitation step may be skipped.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Invite)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> OnboardingStep {
        Self::SEQUENCE
            .get(index)
            .copied()
            .unwrap_or(OnboardingStep::Done)
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Account => "account",
            Self::Connection => "connection",
            Self::Invite => "invite",
            Self::Sync => "sync",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// The single mutable record owned by the onboarding controller.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    /// Display cursor into [`OnboardingStep::SEQUENCE`]; 4 means done. Never decreases.
    pub current_step_index: usize,
    pub account_id: Option<AccountId>,
    pub account_name: Option<String>,
    /// Connections of the current workspace, in creation order.
    pub connections: Vec<Connection>,
    pub invite_completed: bool,
    pub invite_skipped: bool,
    /// Members invited during this session (duplicate check and review list).
    pub invited_members: Vec<Member>,
    pub sync_error: Option<OnboardingError>,
    pub general_error: Option<StepError>,
    pub is_processing: bool,
    /// Set once the first sync was accepted.
    pub completed: bool,
}

impl OnboardingState {
    pub fn current_step(&self) -> OnboardingStep {
        OnboardingStep::from_index(self.current_step_index)
    }

    pub fn has_account(&self) -> bool {
        self.account_id.is_some()
    }

    pub fn has_connections(&self) -> bool {
        self.has_account() && !self.connections.is_empty()
    }

    pub fn is_invite_resolved(&self) -> bool {
        self.invite_completed || self.invite_skipped
    }

    /// Whether any connection already recorded a successful sync.
    pub fn has_successful_sync(&self) -> bool {
        self.connections.iter().any(Connection::has_successful_sync)
    }

    pub fn is_resolved(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::Account => self.has_account(),
            OnboardingStep::Connection => self.has_connections(),
            OnboardingStep::Invite => self.is_invite_resolved(),
            OnboardingStep::Sync | OnboardingStep::Done => self.completed,
        }
    }

    /// The first unresolved step, or `Done` when everything is resolved.
    pub fn frontier(&self) -> OnboardingStep {
        OnboardingStep::SEQUENCE
            .into_iter()
            .find(|step| !self.is_resolved(*step))
            .unwrap_or(OnboardingStep::Done)
    }

    /// Move the display cursor forward to the frontier; it never moves back.
    pub fn advance_display(&mut self) {
        let mut step = self.current_step();
        let target = self.frontier();
        while step < target {
            match step.next() {
                Some(next) if step.can_transition_to(next) => step = next,
                _ => break,
            }
        }
        self.current_step_index = self.current_step_index.max(step.index());
    }

    /// Make `account_id` the current workspace and drop everything collected
    /// for the previous one.
    ///
    /// A workspace that arrives after a completed pass starts the checklist
    /// over; otherwise the display cursor keeps its position.
    pub fn switch_workspace(&mut self, account_id: AccountId, name: String) {
        if self.completed {
            self.current_step_index = OnboardingStep::Account.index();
        }
        self.account_id = Some(account_id);
        self.account_name = Some(name);
        self.connections.clear();
        self.invite_completed = false;
        self.invite_skipped = false;
        self.invited_members.clear();
        self.sync_error = None;
        self.completed = false;
    }

    /// Whether `sync` may be triggered now.
    pub fn sync_ready(&self) -> bool {
        self.has_account() && self.has_connections() && self.is_invite_resolved()
    }

    pub fn error_for(&self, step: OnboardingStep) -> Option<&OnboardingError> {
        if step == OnboardingStep::Sync {
            if let Some(ref err) = self.sync_error {
                return Some(err);
            }
        }
        self.general_error
            .as_ref()
            .filter(|e| e.step == step)
            .map(|e| &e.error)
    }
}

/// Injectable owner of [`OnboardingState`].
///
/// All writes go through [`StateStore::patch`] and [`StateStore::reset`];
/// views read snapshots, the derived [`FlowState`], or subscribe to changes.
#[derive(Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<OnboardingState>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_state(OnboardingState::default())
    }

    /// Rehydrate from a previously captured state. The processing flag is
    /// never carried over.
    pub fn with_state(mut state: OnboardingState) -> Self {
        state.is_processing = false;
        let (tx, _rx) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> OnboardingState {
        self.tx.borrow().clone()
    }

    /// Read without cloning the whole record.
    pub fn read<R>(&self, f: impl FnOnce(&OnboardingState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<OnboardingState> {
        self.tx.subscribe()
    }

    pub fn patch(&self, f: impl FnOnce(&mut OnboardingState)) {
        self.tx.send_modify(f);
    }

    /// Back to a fresh state. The processing flag belongs to the
    /// [`ProcessingGuard`] that set it and is kept as is.
    pub fn reset(&self) {
        self.tx.send_modify(|state| {
            *state = OnboardingState {
                is_processing: state.is_processing,
                ..OnboardingState::default()
            };
        });
    }

    pub fn flow(&self) -> FlowState {
        self.read(FlowState::derive)
    }

    pub fn is_processing(&self) -> bool {
        self.read(|s| s.is_processing)
    }

    /// Atomically claim the processing flag. Returns `None` if a mutation is
    /// already in flight; the flag is released when the guard drops.
    pub fn try_begin_processing(&self) -> Option<ProcessingGuard> {
        let acquired = self.tx.send_if_modified(|state| {
            if state.is_processing {
                false
            } else {
                state.is_processing = true;
                true
            }
        });
        acquired.then(|| ProcessingGuard {
            store: self.clone(),
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases `is_processing` on drop.
pub struct ProcessingGuard {
    store: StateStore,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.store.patch(|state| state.is_processing = false);
    }
}
