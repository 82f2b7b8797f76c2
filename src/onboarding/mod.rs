//! Onboarding: the getting-started flow for a new DataPulse workspace.
//!
//! A workspace is created, a marketplace connection attached, teammates
//! optionally invited, and the first ETL synchronization triggered. The
//! controller owns the state and enforces the order; views only read the
//! derived [`FlowState`].

pub mod controller;
pub mod effects;
pub mod flow;
pub mod forms;
pub mod routes;
pub mod state;

pub use controller::{OnboardingController, StepOutcome};
pub use effects::{Navigator, Notifier, PreferenceNavigator, Toast, ToastLevel, TracingNotifier, overview_path};
pub use flow::{ActionKind, FlowState, StepAction, StepStatus, StepView};
pub use forms::{AccountForm, ConnectionForm, InviteForm};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{OnboardingState, OnboardingStep, ProcessingGuard, StateStore};
