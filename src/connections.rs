//! Connection list of the selected workspace, loaded in the background.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{AccountId, Connection, DataPulseApi};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionsSnapshot {
    Idle,
    Loading {
        account_id: AccountId,
    },
    Loaded {
        account_id: AccountId,
        connections: Vec<Connection>,
    },
    Failed {
        account_id: AccountId,
        error: ApiError,
    },
}

impl ConnectionsSnapshot {
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::Idle => None,
            Self::Loading { account_id }
            | Self::Loaded { account_id, .. }
            | Self::Failed { account_id, .. } => Some(*account_id),
        }
    }

    pub fn connections(&self) -> &[Connection] {
        match self {
            Self::Loaded { connections, .. } => connections,
            _ => &[],
        }
    }
}

/// Loads connections for whichever workspace was selected last.
///
/// Selecting another workspace aborts the in-flight load; a result that
/// belongs to an earlier selection is never published.
pub struct ConnectionsLoader {
    api: Arc<dyn DataPulseApi>,
    tx: Arc<watch::Sender<ConnectionsSnapshot>>,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionsLoader {
    pub fn new(api: Arc<dyn DataPulseApi>) -> Self {
        let (tx, _rx) = watch::channel(ConnectionsSnapshot::Idle);
        Self {
            api,
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> ConnectionsSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionsSnapshot> {
        self.tx.subscribe()
    }

    /// Start loading the connections of `account_id`, superseding any earlier load.
    pub async fn select_account(&self, account_id: AccountId) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let mut generation = 0;
        self.tx.send_modify(|snapshot| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *snapshot = ConnectionsSnapshot::Loading { account_id };
        });
        debug!(account_id, generation, "Loading connections");

        let api = Arc::clone(&self.api);
        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.generation);
        *task = Some(tokio::spawn(async move {
            let next = match api.list_connections(account_id).await {
                Ok(connections) => {
                    info!(account_id, count = connections.len(), "Connections loaded");
                    ConnectionsSnapshot::Loaded {
                        account_id,
                        connections,
                    }
                }
                Err(error) => {
                    warn!(account_id, "Failed to load connections: {error}");
                    ConnectionsSnapshot::Failed { account_id, error }
                }
            };
            let published = tx.send_if_modified(|snapshot| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *snapshot = next;
                true
            });
            if !published {
                debug!(account_id, generation, "Discarding superseded connections load");
            }
        }));
    }

    /// Load the current workspace again.
    pub async fn reload(&self) {
        if let Some(account_id) = self.snapshot().account_id() {
            self.select_account(account_id).await;
        }
    }

    /// Drop the selection and any in-flight load.
    pub async fn clear(&self) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.abort();
        }
        self.tx.send_modify(|snapshot| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *snapshot = ConnectionsSnapshot::Idle;
        });
    }
}

impl Drop for ConnectionsLoader {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
