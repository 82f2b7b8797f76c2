//! DataPulse REST API: the collaborators the onboarding controller orchestrates.
//!
//! The [`DataPulseApi`] trait is the seam between workflow logic and the
//! network. [`HttpApiClient`] is the production implementation; tests plug in
//! their own.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod models;

pub use client::HttpApiClient;
pub use models::*;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::etl::ScenarioRunRequest;

/// Remote procedure calls against the DataPulse backend.
///
/// Every failure is normalized into [`ApiError`] before it is returned.
#[async_trait]
pub trait DataPulseApi: Send + Sync {
    /// Ask the identity proxy whether the current session is authenticated.
    async fn session_active(&self) -> Result<bool, ApiError>;

    // ── Accounts ────────────────────────────────────────────────────

    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError>;

    async fn get_account(&self, account_id: AccountId) -> Result<Account, ApiError>;

    async fn create_account(&self, account: &NewAccount) -> Result<Account, ApiError>;

    async fn update_account(
        &self,
        account_id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, ApiError>;

    async fn delete_account(&self, account_id: AccountId) -> Result<(), ApiError>;

    // ── Connections ─────────────────────────────────────────────────

    async fn list_connections(&self, account_id: AccountId) -> Result<Vec<Connection>, ApiError>;

    async fn create_connection(
        &self,
        account_id: AccountId,
        connection: &NewConnection,
    ) -> Result<Connection, ApiError>;

    async fn update_connection(
        &self,
        account_id: AccountId,
        connection_id: ConnectionId,
        update: &ConnectionUpdate,
    ) -> Result<Connection, ApiError>;

    async fn delete_connection(
        &self,
        account_id: AccountId,
        connection_id: ConnectionId,
    ) -> Result<(), ApiError>;

    // ── Members ─────────────────────────────────────────────────────

    async fn list_members(&self, account_id: AccountId) -> Result<Vec<Member>, ApiError>;

    async fn create_member(
        &self,
        account_id: AccountId,
        member: &NewMember,
    ) -> Result<Member, ApiError>;

    async fn update_member(
        &self,
        account_id: AccountId,
        member_id: MemberId,
        update: &MemberUpdate,
    ) -> Result<Member, ApiError>;

    async fn delete_member(&self, account_id: AccountId, member_id: MemberId)
    -> Result<(), ApiError>;

    // ── Synchronization ─────────────────────────────────────────────

    /// Fire an ETL scenario. Returns the HTTP status of any 2xx response.
    async fn run_etl_scenario(&self, request: &ScenarioRunRequest) -> Result<u16, ApiError>;

    /// Start a single connection's sync (legacy flow).
    async fn start_connection_sync(
        &self,
        connection_id: ConnectionId,
    ) -> Result<SyncStatusReport, ApiError>;

    /// Read a single connection's sync status (legacy flow).
    async fn connection_sync_status(
        &self,
        connection_id: ConnectionId,
    ) -> Result<SyncStatusReport, ApiError>;
}
