//! Wire models for the DataPulse REST API.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type AccountId = i64;
pub type ConnectionId = i64;
pub type MemberId = i64;

// ── Accounts ────────────────────────────────────────────────────────────

/// A workspace: the top-level tenant owning connections and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

// ── Connections ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Marketplace {
    Wildberries,
    Ozon,
}

impl Marketplace {
    /// Human-readable name for messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Wildberries => "Wildberries",
            Self::Ozon => "Ozon",
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wildberries => write!(f, "WILDBERRIES"),
            Self::Ozon => write!(f, "OZON"),
        }
    }
}

/// Marketplace credentials. The variant decides the marketplace.
///
/// Serialized without a tag (`{"token"}` or `{"clientId", "apiKey"}`); the
/// marketplace travels next to it in the enclosing object.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    #[serde(rename_all = "camelCase")]
    Ozon {
        client_id: String,
        #[serde(serialize_with = "expose", deserialize_with = "secret")]
        api_key: SecretString,
    },
    Wildberries {
        #[serde(serialize_with = "expose", deserialize_with = "secret")]
        token: SecretString,
    },
}

impl Credentials {
    pub fn wildberries(token: impl Into<String>) -> Self {
        Self::Wildberries {
            token: SecretString::from(token.into()),
        }
    }

    pub fn ozon(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::Ozon {
            client_id: client_id.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }

    pub fn marketplace(&self) -> Marketplace {
        match self {
            Self::Wildberries { .. } => Marketplace::Wildberries,
            Self::Ozon { .. } => Marketplace::Ozon,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wildberries { .. } => f
                .debug_struct("Wildberries")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Ozon { client_id, .. } => f
                .debug_struct("Ozon")
                .field("client_id", client_id)
                .field("api_key", &"[REDACTED]")
                .finish(),
        }
    }
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Last known state of a connection's synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    New,
    Queued,
    Running,
    Completed,
    Success,
    Failed,
}

impl SyncStatus {
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Completed | Self::Success)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Success | Self::Failed)
    }
}

/// A configured credential binding to one marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub account_id: AccountId,
    pub marketplace: Marketplace,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sync_status: Option<SyncStatus>,
    #[serde(default, skip_serializing)]
    pub credentials: Option<Credentials>,
}

impl Connection {
    pub fn has_successful_sync(&self) -> bool {
        self.last_sync_status.is_some_and(|s| s.is_successful())
    }
}

/// Body of `POST /api/accounts/{accountId}/connections`.
#[derive(Debug, Clone, Serialize)]
pub struct NewConnection {
    marketplace: Marketplace,
    credentials: Credentials,
    active: bool,
}

impl NewConnection {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            marketplace: credentials.marketplace(),
            credentials,
            active: true,
        }
    }

    pub fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// Body of `PUT /api/accounts/{accountId}/connections/{connectionId}`.
///
/// Replacing credentials also sends the marketplace they belong to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marketplace: Option<Marketplace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<Credentials>,
}

impl ConnectionUpdate {
    pub fn set_active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.marketplace = Some(credentials.marketplace());
        self.credentials = Some(credentials);
        self
    }
}

/// Response of the legacy sync start/status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusReport {
    pub status: SyncStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ── Members ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Admin,
    #[serde(alias = "ANALYST")]
    Operator,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Invited,
    #[serde(alias = "INACTIVE")]
    Blocked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessScope {
    #[default]
    All,
    Selected,
}

/// Which connections a member may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAccess {
    All,
    Selected(Vec<ConnectionId>),
}

impl MemberAccess {
    fn into_wire(self) -> (AccessScope, Vec<ConnectionId>) {
        match self {
            Self::All => (AccessScope::All, Vec::new()),
            Self::Selected(ids) => (AccessScope::Selected, ids),
        }
    }
}

/// A user's membership in a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub account_id: AccountId,
    pub email: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    #[serde(default)]
    pub access_scope: AccessScope,
    #[serde(default)]
    pub connection_ids: Vec<ConnectionId>,
}

impl Member {
    pub fn access(&self) -> MemberAccess {
        match self.access_scope {
            AccessScope::All => MemberAccess::All,
            AccessScope::Selected => MemberAccess::Selected(self.connection_ids.clone()),
        }
    }
}

/// Body of `POST /api/accounts/{accountId}/members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub email: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub access_scope: AccessScope,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connection_ids: Vec<ConnectionId>,
}

impl NewMember {
    /// A pending invitation.
    pub fn invite(email: impl Into<String>, role: MemberRole, access: MemberAccess) -> Self {
        let (access_scope, connection_ids) = access.into_wire();
        Self {
            email: email.into(),
            role,
            status: MemberStatus::Invited,
            access_scope,
            connection_ids,
        }
    }
}

/// Body of `PUT /api/accounts/{accountId}/members/{memberId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemberStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_scope: Option<AccessScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_ids: Option<Vec<ConnectionId>>,
}

impl MemberUpdate {
    pub fn role(role: MemberRole) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn status(status: MemberStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn access(access: MemberAccess) -> Self {
        let (scope, ids) = access.into_wire();
        Self {
            access_scope: Some(scope),
            connection_ids: Some(ids),
            ..Default::default()
        }
    }

    /// Apply the update to a local copy, the way the server would.
    pub fn apply_to(&self, member: &mut Member) {
        if let Some(role) = self.role {
            member.role = role;
        }
        if let Some(status) = self.status {
            member.status = status;
        }
        if let Some(scope) = self.access_scope {
            member.access_scope = scope;
        }
        if let Some(ref ids) = self.connection_ids {
            member.connection_ids = ids.clone();
        }
    }
}

fn default_true() -> bool {
    true
}
