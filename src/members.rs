//! Member roster of a workspace with optimistic role, status and removal edits.
//!
//! Each edit is applied locally first. The previous entry is captured before
//! the optimistic write and put back if the server rejects the change; on
//! success the server's copy replaces the local one.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::{AccountId, DataPulseApi, Member, MemberId, MemberRole, MemberStatus, MemberUpdate};
use crate::error::OnboardingError;
use crate::onboarding::InviteForm;

pub struct MemberRoster {
    api: Arc<dyn DataPulseApi>,
    account_id: AccountId,
    members: RwLock<Vec<Member>>,
}

impl MemberRoster {
    pub fn new(api: Arc<dyn DataPulseApi>, account_id: AccountId) -> Self {
        Self {
            api,
            account_id,
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub async fn members(&self) -> Vec<Member> {
        self.members.read().await.clone()
    }

    /// Replace the local roster with the server's.
    pub async fn load(&self) -> Result<usize, OnboardingError> {
        let members = self.api.list_members(self.account_id).await?;
        let count = members.len();
        *self.members.write().await = members;
        info!(account_id = self.account_id, count, "Member roster loaded");
        Ok(count)
    }

    /// Invite someone who is not on the roster yet.
    pub async fn invite(&self, form: &InviteForm) -> Result<Member, OnboardingError> {
        let body = {
            let members = self.members.read().await;
            form.validate(&members)?
        };
        let member = self.api.create_member(self.account_id, &body).await?;
        info!(account_id = self.account_id, member_id = member.id, "Member invited");
        self.members.write().await.push(member.clone());
        Ok(member)
    }

    pub async fn update_role(
        &self,
        member_id: MemberId,
        role: MemberRole,
    ) -> Result<Member, OnboardingError> {
        self.update(member_id, MemberUpdate::role(role)).await
    }

    pub async fn update_status(
        &self,
        member_id: MemberId,
        status: MemberStatus,
    ) -> Result<Member, OnboardingError> {
        self.update(member_id, MemberUpdate::status(status)).await
    }

    async fn update(
        &self,
        member_id: MemberId,
        update: MemberUpdate,
    ) -> Result<Member, OnboardingError> {
        let previous = {
            let mut members = self.members.write().await;
            let member = members
                .iter_mut()
                .find(|m| m.id == member_id)
                .ok_or_else(|| unknown_member(member_id))?;
            let previous = member.clone();
            update.apply_to(member);
            previous
        };

        match self
            .api
            .update_member(self.account_id, member_id, &update)
            .await
        {
            Ok(server) => {
                let mut members = self.members.write().await;
                if let Some(member) = members.iter_mut().find(|m| m.id == member_id) {
                    *member = server.clone();
                }
                info!(account_id = self.account_id, member_id, "Member updated");
                Ok(server)
            }
            Err(e) => {
                warn!(account_id = self.account_id, member_id, "Member update rejected, rolling back: {e}");
                let mut members = self.members.write().await;
                if let Some(member) = members.iter_mut().find(|m| m.id == member_id) {
                    *member = previous;
                }
                Err(e.into())
            }
        }
    }

    pub async fn remove(&self, member_id: MemberId) -> Result<(), OnboardingError> {
        let (index, previous) = {
            let mut members = self.members.write().await;
            let index = members
                .iter()
                .position(|m| m.id == member_id)
                .ok_or_else(|| unknown_member(member_id))?;
            (index, members.remove(index))
        };

        match self.api.delete_member(self.account_id, member_id).await {
            Ok(()) => {
                info!(account_id = self.account_id, member_id, "Member removed");
                Ok(())
            }
            Err(e) => {
                warn!(account_id = self.account_id, member_id, "Member removal rejected, rolling back: {e}");
                let mut members = self.members.write().await;
                let index = index.min(members.len());
                members.insert(index, previous);
                Err(e.into())
            }
        }
    }
}

fn unknown_member(member_id: MemberId) -> OnboardingError {
    OnboardingError::validation(format!("Member {member_id} is not part of this workspace"))
}
