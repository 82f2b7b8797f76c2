//! Form inputs for the onboarding steps and their local validation.
//!
//! Validation never touches the network: a form either turns into a request
//! body or into [`OnboardingError::Validation`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::api::{
    AccessScope, ConnectionId, Credentials, Marketplace, Member, MemberAccess, MemberRole,
    NewAccount, NewMember,
};
use crate::error::OnboardingError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Maximum workspace name length accepted by the accounts service.
const MAX_ACCOUNT_NAME_LEN: usize = 120;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub name: String,
}

impl AccountForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<NewAccount, OnboardingError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(OnboardingError::validation("Workspace name is required"));
        }
        if name.chars().count() > MAX_ACCOUNT_NAME_LEN {
            return Err(OnboardingError::validation(format!(
                "Workspace name must be at most {MAX_ACCOUNT_NAME_LEN} characters"
            )));
        }
        Ok(NewAccount {
            name: name.to_string(),
            active: true,
        })
    }
}

/// Connection form. Only the fields of the selected marketplace are read.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionForm {
    #[serde(default)]
    pub marketplace: Option<Marketplace>,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub api_key: String,
}

impl ConnectionForm {
    pub fn wildberries(token: impl Into<String>) -> Self {
        Self {
            marketplace: Some(Marketplace::Wildberries),
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn ozon(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            marketplace: Some(Marketplace::Ozon),
            client_id: client_id.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Switch marketplace, clearing the fields of the other branch.
    pub fn set_marketplace(&mut self, marketplace: Marketplace) {
        if self.marketplace != Some(marketplace) {
            match marketplace {
                Marketplace::Wildberries => {
                    self.client_id.clear();
                    self.api_key.clear();
                }
                Marketplace::Ozon => self.token.clear(),
            }
        }
        self.marketplace = Some(marketplace);
    }

    /// Build the credential variant for the selected marketplace.
    pub fn credentials(&self) -> Result<Credentials, OnboardingError> {
        match self.marketplace {
            None => Err(OnboardingError::validation("Select a marketplace")),
            Some(Marketplace::Wildberries) => {
                let token = self.token.trim();
                if token.is_empty() {
                    return Err(OnboardingError::validation("Wildberries API token is required"));
                }
                Ok(Credentials::wildberries(token))
            }
            Some(Marketplace::Ozon) => {
                let client_id = self.client_id.trim();
                let api_key = self.api_key.trim();
                if client_id.is_empty() {
                    return Err(OnboardingError::validation("Ozon Client-Id is required"));
                }
                if api_key.is_empty() {
                    return Err(OnboardingError::validation("Ozon API key is required"));
                }
                Ok(Credentials::ozon(client_id, api_key))
            }
        }
    }
}

impl std::fmt::Debug for ConnectionForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionForm")
            .field("marketplace", &self.marketplace)
            .field("token", &redacted(&self.token))
            .field("client_id", &self.client_id)
            .field("api_key", &redacted(&self.api_key))
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "[REDACTED]" }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteForm {
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_invite_role")]
    pub role: MemberRole,
    #[serde(default)]
    pub access_scope: AccessScope,
    #[serde(default)]
    pub connection_ids: Vec<ConnectionId>,
}

fn default_invite_role() -> MemberRole {
    MemberRole::Viewer
}

impl InviteForm {
    pub fn new(email: impl Into<String>, role: MemberRole) -> Self {
        Self {
            email: email.into(),
            role,
            access_scope: AccessScope::All,
            connection_ids: Vec::new(),
        }
    }

    pub fn with_connections(mut self, ids: Vec<ConnectionId>) -> Self {
        self.access_scope = AccessScope::Selected;
        self.connection_ids = ids;
        self
    }

    /// Validate against the members already invited in this session.
    pub fn validate(&self, already_invited: &[Member]) -> Result<NewMember, OnboardingError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(OnboardingError::validation("Email is required"));
        }
        if !is_valid_email(email) {
            return Err(OnboardingError::validation(format!(
                "{email} is not a valid email address"
            )));
        }
        if already_invited
            .iter()
            .any(|m| m.email.eq_ignore_ascii_case(email))
        {
            return Err(OnboardingError::validation(format!(
                "{email} has already been invited"
            )));
        }

        let access = match self.access_scope {
            AccessScope::All => MemberAccess::All,
            AccessScope::Selected if self.connection_ids.is_empty() => {
                return Err(OnboardingError::validation(
                    "Select at least one connection for restricted access",
                ));
            }
            AccessScope::Selected => MemberAccess::Selected(self.connection_ids.clone()),
        };

        Ok(NewMember::invite(email.to_ascii_lowercase(), self.role, access))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
