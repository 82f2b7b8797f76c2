//! Side-effect collaborators of the controller: navigation and toasts.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::AccountId;
use crate::preferences::Preferences;

/// Path of the analytics overview for a workspace.
pub fn overview_path(account_id: AccountId) -> String {
    format!("/accounts/{account_id}/overview")
}

/// Moves the user to another destination once onboarding completes.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn open_overview(&self, account_id: AccountId);
}

/// Navigator that remembers the overview as the workspace's last visited path.
pub struct PreferenceNavigator {
    preferences: Preferences,
}

impl PreferenceNavigator {
    pub fn new(preferences: Preferences) -> Self {
        Self { preferences }
    }
}

#[async_trait]
impl Navigator for PreferenceNavigator {
    async fn open_overview(&self, account_id: AccountId) {
        let path = overview_path(account_id);
        info!(account_id, path = %path, "Navigating to workspace overview");
        self.preferences.set_last_path(account_id, &path).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Success,
    Error,
}

/// A transient, non-blocking notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Success => info!(toast = %toast.message, "Notification"),
            ToastLevel::Error => warn!(toast = %toast.message, "Notification"),
        }
    }
}
