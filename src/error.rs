//! Error types for DataPulse.

use serde::{Deserialize, Serialize};

use crate::onboarding::OnboardingStep;

/// Top-level error type for the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Onboarding error: {0}")]
    Onboarding(#[from] OnboardingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// A transport or server failure, normalized before it reaches workflow logic.
///
/// `status` is the HTTP status code, or `0` when no response was received
/// (connection refused, timeout, TLS failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            correlation_id: None,
        }
    }

    /// A failure where no HTTP response was received.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn is_transport(&self) -> bool {
        self.status == 0
    }
}

/// Errors produced by the onboarding controller.
///
/// Validation and guard errors are raised locally and never reach the
/// network; they differ only in what they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OnboardingError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Guard { message: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Synchronization was not accepted (status {status})")]
    UnexpectedStatus { status: u16 },
}

impl OnboardingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn guard(message: impl Into<String>) -> Self {
        Self::Guard {
            message: message.into(),
        }
    }

    /// Whether the error was produced without a network round-trip.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Guard { .. })
    }
}

/// An error attached to the onboarding step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepError {
    pub step: OnboardingStep,
    pub error: OnboardingError,
}

/// Preference storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the client.
pub type Result<T> = std::result::Result<T, Error>;
