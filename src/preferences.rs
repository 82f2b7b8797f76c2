//! Small persisted preferences used for UX continuity.
//!
//! Mirrors what a browser client keeps in local storage: whether onboarding
//! is in progress, the last selected workspace, and the last visited path per
//! workspace. None of it affects workflow correctness, so the typed facade
//! logs storage failures instead of returning them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::AccountId;
use crate::error::StorageError;

/// Preference keys. Each has exactly one writer.
pub mod preference_keys {
    use crate::api::AccountId;

    /// Written by the onboarding controller.
    pub const ONBOARDING_ACTIVE: &str = "datapulse.onboarding.active";
    /// Written by the onboarding controller when a workspace is created or resumed.
    pub const LAST_ACCOUNT_ID: &str = "datapulse.lastAccountId";

    /// Written by the navigator.
    pub fn last_path(account_id: AccountId) -> String {
        format!("datapulse.lastPath.{account_id}")
    }
}

/// Key/value storage backend.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-lifetime storage.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object on disk, rewritten on every change.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl JsonFilePreferenceStore {
    /// Open the file at `path`, starting empty if it does not exist or is unreadable.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), "Discarding unreadable preferences file: {e}");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "Preferences loaded");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        self.persist(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.write().await;
        if values.remove(key).is_some() {
            self.persist(&values).await?;
        }
        Ok(())
    }
}

/// Typed access to the DataPulse preference keys.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferenceStore::new()))
    }

    pub async fn onboarding_active(&self) -> bool {
        self.read(preference_keys::ONBOARDING_ACTIVE)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub async fn set_onboarding_active(&self, active: bool) {
        if active {
            self.write(preference_keys::ONBOARDING_ACTIVE, Value::Bool(true))
                .await;
        } else {
            self.clear(preference_keys::ONBOARDING_ACTIVE).await;
        }
    }

    pub async fn last_account_id(&self) -> Option<AccountId> {
        self.read(preference_keys::LAST_ACCOUNT_ID)
            .await
            .and_then(|v| v.as_i64())
    }

    pub async fn set_last_account_id(&self, account_id: AccountId) {
        self.write(preference_keys::LAST_ACCOUNT_ID, Value::from(account_id))
            .await;
    }

    pub async fn last_path(&self, account_id: AccountId) -> Option<String> {
        self.read(&preference_keys::last_path(account_id))
            .await
            .and_then(|v| v.as_str().map(str::to_string))
    }

    pub async fn set_last_path(&self, account_id: AccountId, path: &str) {
        self.write(&preference_keys::last_path(account_id), Value::from(path))
            .await;
    }

    async fn read(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Failed to read preference: {e}");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: Value) {
        if let Err(e) = self.store.set(key, value).await {
            warn!(key, "Failed to persist preference: {e}");
        }
    }

    async fn clear(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!(key, "Failed to clear preference: {e}");
        }
    }
}
