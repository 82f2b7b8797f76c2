//! Session gate: whether the identity proxy considers the user signed in.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::DataPulseApi;

/// Boolean authentication state shared by the onboarding views.
///
/// Starts unauthenticated until [`AuthGate::refresh`] or [`AuthGate::set`]
/// says otherwise.
pub struct AuthGate {
    tx: watch::Sender<bool>,
}

impl AuthGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn set(&self, authenticated: bool) {
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != authenticated;
            *current = authenticated;
            changed
        });
        if changed {
            info!(authenticated, "Session state changed");
        }
    }

    /// Ask the identity proxy. Any failure counts as signed out.
    pub async fn refresh(&self, api: &dyn DataPulseApi) -> bool {
        let authenticated = match api.session_active().await {
            Ok(active) => active,
            Err(e) => {
                warn!(status = e.status, "Session probe failed: {e}");
                false
            }
        };
        debug!(authenticated, "Session probed");
        self.set(authenticated);
        authenticated
    }
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}
