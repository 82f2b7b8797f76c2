//! In-memory [`DataPulseApi`] for unit tests, with call recording, injected
//! failures and a one-shot in-flight gate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::DataPulseApi;
use super::models::*;
use crate::error::ApiError;
use crate::etl::ScenarioRunRequest;

pub(crate) struct FakeApi {
    calls: Mutex<Vec<&'static str>>,
    next_id: AtomicI64,
    next_account_id: Mutex<Option<AccountId>>,
    pub accounts: Mutex<Vec<Account>>,
    pub connections: Mutex<Vec<Connection>>,
    pub members: Mutex<Vec<Member>>,
    pub scenario_requests: Mutex<Vec<ScenarioRunRequest>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    etl_status: Mutex<u16>,
    session: Mutex<bool>,
    sync_status: Mutex<SyncStatus>,
    hold: Mutex<Option<&'static str>>,
    entered: Notify,
    release: Notify,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            next_account_id: Mutex::new(None),
            accounts: Mutex::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
            members: Mutex::new(Vec::new()),
            scenario_requests: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            etl_status: Mutex::new(202),
            session: Mutex::new(true),
            sync_status: Mutex::new(SyncStatus::Running),
            hold: Mutex::new(None),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// The next created account gets this id.
    pub fn next_account_id(&self, id: AccountId) {
        *self.next_account_id.lock().unwrap() = Some(id);
    }

    pub fn fail(&self, op: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn recover(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    pub fn set_etl_status(&self, status: u16) {
        *self.etl_status.lock().unwrap() = status;
    }

    pub fn set_session(&self, active: bool) {
        *self.session.lock().unwrap() = active;
    }

    pub fn set_sync_status(&self, status: SyncStatus) {
        *self.sync_status.lock().unwrap() = status;
    }

    /// Block the next call to `op` until [`FakeApi::release`].
    pub fn hold(&self, op: &'static str) {
        *self.hold.lock().unwrap() = Some(op);
    }

    /// Wait until the held call is in flight.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn seed_connection(&self, account_id: AccountId, status: Option<SyncStatus>) -> Connection {
        let connection = Connection {
            id: self.next_id(),
            account_id,
            marketplace: Marketplace::Wildberries,
            active: true,
            last_sync_at: None,
            last_sync_status: status,
            credentials: None,
        };
        self.connections.lock().unwrap().push(connection.clone());
        connection
    }

    pub fn seed_member(&self, account_id: AccountId, email: &str, role: MemberRole) -> Member {
        let member = Member {
            id: self.next_id(),
            account_id,
            email: email.to_string(),
            role,
            status: MemberStatus::Active,
            access_scope: AccessScope::All,
            connection_ids: Vec::new(),
        };
        self.members.lock().unwrap().push(member.clone());
        member
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn enter(&self, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(op);

        let held = {
            let mut hold = self.hold.lock().unwrap();
            if *hold == Some(op) {
                *hold = None;
                true
            } else {
                false
            }
        };
        if held {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let failure = self.failures.lock().unwrap().get(op).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::new(404, format!("{what} not found"))
    }
}

#[async_trait]
impl DataPulseApi for FakeApi {
    async fn session_active(&self) -> Result<bool, ApiError> {
        self.enter("session_active").await?;
        Ok(*self.session.lock().unwrap())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.enter("list_accounts").await?;
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Account, ApiError> {
        self.enter("get_account").await?;
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Account"))
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account, ApiError> {
        self.enter("create_account").await?;
        let id = self
            .next_account_id
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| self.next_id());
        let created = Account {
            id,
            name: account.name.clone(),
            active: account.active,
            created_at: Some(chrono::Utc::now()),
            updated_at: None,
        };
        self.accounts.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_account(
        &self,
        account_id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, ApiError> {
        self.enter("update_account").await?;
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| Self::not_found("Account"))?;
        if let Some(ref name) = update.name {
            account.name = name.clone();
        }
        if let Some(active) = update.active {
            account.active = active;
        }
        Ok(account.clone())
    }

    async fn delete_account(&self, account_id: AccountId) -> Result<(), ApiError> {
        self.enter("delete_account").await?;
        self.accounts.lock().unwrap().retain(|a| a.id != account_id);
        Ok(())
    }

    async fn list_connections(&self, account_id: AccountId) -> Result<Vec<Connection>, ApiError> {
        self.enter("list_connections").await?;
        Ok(self
            .connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn create_connection(
        &self,
        account_id: AccountId,
        connection: &NewConnection,
    ) -> Result<Connection, ApiError> {
        self.enter("create_connection").await?;
        let created = Connection {
            id: self.next_id(),
            account_id,
            marketplace: connection.marketplace(),
            active: true,
            last_sync_at: None,
            last_sync_status: None,
            credentials: Some(connection.credentials().clone()),
        };
        self.connections.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_connection(
        &self,
        account_id: AccountId,
        connection_id: ConnectionId,
        update: &ConnectionUpdate,
    ) -> Result<Connection, ApiError> {
        self.enter("update_connection").await?;
        let mut connections = self.connections.lock().unwrap();
        let connection = connections
            .iter_mut()
            .find(|c| c.account_id == account_id && c.id == connection_id)
            .ok_or_else(|| Self::not_found("Connection"))?;
        if let Some(active) = update.active {
            connection.active = active;
        }
        Ok(connection.clone())
    }

    async fn delete_connection(
        &self,
        account_id: AccountId,
        connection_id: ConnectionId,
    ) -> Result<(), ApiError> {
        self.enter("delete_connection").await?;
        self.connections
            .lock()
            .unwrap()
            .retain(|c| !(c.account_id == account_id && c.id == connection_id));
        Ok(())
    }

    async fn list_members(&self, account_id: AccountId) -> Result<Vec<Member>, ApiError> {
        self.enter("list_members").await?;
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn create_member(
        &self,
        account_id: AccountId,
        member: &NewMember,
    ) -> Result<Member, ApiError> {
        self.enter("create_member").await?;
        let created = Member {
            id: self.next_id(),
            account_id,
            email: member.email.clone(),
            role: member.role,
            status: member.status,
            access_scope: member.access_scope,
            connection_ids: member.connection_ids.clone(),
        };
        self.members.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_member(
        &self,
        account_id: AccountId,
        member_id: MemberId,
        update: &MemberUpdate,
    ) -> Result<Member, ApiError> {
        self.enter("update_member").await?;
        let mut members = self.members.lock().unwrap();
        let member = members
            .iter_mut()
            .find(|m| m.account_id == account_id && m.id == member_id)
            .ok_or_else(|| Self::not_found("Member"))?;
        update.apply_to(member);
        Ok(member.clone())
    }

    async fn delete_member(
        &self,
        account_id: AccountId,
        member_id: MemberId,
    ) -> Result<(), ApiError> {
        self.enter("delete_member").await?;
        self.members
            .lock()
            .unwrap()
            .retain(|m| !(m.account_id == account_id && m.id == member_id));
        Ok(())
    }

    async fn run_etl_scenario(&self, request: &ScenarioRunRequest) -> Result<u16, ApiError> {
        self.enter("run_etl_scenario").await?;
        self.scenario_requests.lock().unwrap().push(request.clone());
        Ok(*self.etl_status.lock().unwrap())
    }

    async fn start_connection_sync(
        &self,
        _connection_id: ConnectionId,
    ) -> Result<SyncStatusReport, ApiError> {
        self.enter("start_connection_sync").await?;
        Ok(SyncStatusReport {
            status: SyncStatus::Queued,
            message: None,
            updated_at: None,
        })
    }

    async fn connection_sync_status(
        &self,
        _connection_id: ConnectionId,
    ) -> Result<SyncStatusReport, ApiError> {
        self.enter("connection_sync_status").await?;
        Ok(SyncStatusReport {
            status: *self.sync_status.lock().unwrap(),
            message: None,
            updated_at: None,
        })
    }
}
