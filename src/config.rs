//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default backend base URL (same-origin proxy in front of the services).
pub const DEFAULT_API_URL: &str = "http://localhost:8081";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the DataPulse backend.
    pub api_base_url: String,
    /// Bearer token forwarded to the backend, when the identity proxy needs one.
    pub api_token: Option<SecretString>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Interval of the legacy sync-status poll.
    pub sync_poll_interval: Duration,
    /// Port the onboarding router listens on.
    pub listen_port: u16,
    /// JSON file holding the persisted preferences.
    pub preferences_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
            sync_poll_interval: Duration::from_secs(5),
            listen_port: 8080,
            preferences_path: PathBuf::from("./data/preferences.json"),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from `DATAPULSE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("DATAPULSE_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_base_url);
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "DATAPULSE_API_URL".into(),
                message: format!("expected an http(s) URL, got {api_base_url}"),
            });
        }

        let api_token = lookup("DATAPULSE_API_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        let request_timeout = parse_secs(&lookup, "DATAPULSE_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(defaults.request_timeout);
        let sync_poll_interval = parse_secs(&lookup, "DATAPULSE_SYNC_POLL_SECS")?
            .unwrap_or(defaults.sync_poll_interval);

        let listen_port = match lookup("DATAPULSE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "DATAPULSE_PORT".into(),
                message: format!("not a port number: {raw}"),
            })?,
            None => defaults.listen_port,
        };

        let preferences_path = lookup("DATAPULSE_PREFERENCES_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.preferences_path);

        Ok(Self {
            api_base_url,
            api_token,
            request_timeout,
            sync_poll_interval,
            listen_port,
            preferences_path,
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected whole seconds, got {raw}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}
