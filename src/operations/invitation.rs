// 邀请操作
// 状态只能从 pending 进入 accepted 或 rejected，接受邀请时同时加入群组

use std::sync::Arc;

use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{Invitation, InvitationStatus};
use crate::store::DocumentStore;

pub struct InvitationOperation {
    store: Arc<dyn DocumentStore>,
}

impl InvitationOperation {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> Result<Invitation, ServiceError> {
        self.store
            .find_invitation(id)
            .await?
            .ok_or(ServiceError::NotFound("Invitation"))
    }

    /// 加载邀请并要求调用者是被邀请人
    async fn load_for_invitee(&self, caller: Uuid, id: Uuid) -> Result<Invitation, ServiceError> {
        let invitation = self.load(id).await?;
        if invitation.invitee_id != caller {
            return Err(ServiceError::forbidden(
                "Only the invitee can respond to this invitation",
            ));
        }
        Ok(invitation)
    }

    pub async fn invite(
        &self,
        inviter: Uuid,
        group_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Invitation, ServiceError> {
        if self.store.find_group(group_id).await?.is_none() {
            return Err(ServiceError::NotFound("Group"));
        }
        if self.store.find_user(invitee_id).await?.is_none() {
            return Err(ServiceError::NotFound("User"));
        }

        let invitation = Invitation::new(group_id, invitee_id, inviter);
        self.store.insert_invitation(&invitation).await?;

        tracing::info!(
            invitation_id = %invitation.id,
            %group_id,
            %inviter,
            invitee = %invitee_id,
            "invitation sent"
        );
        Ok(invitation)
    }

    /// 重试已接受的邀请直接返回成功，不会重复加入
    pub async fn accept(&self, caller: Uuid, id: Uuid) -> Result<Invitation, ServiceError> {
        let invitation = self.load_for_invitee(caller, id).await?;
        invitation.check_transition(InvitationStatus::Accepted)?;

        let accepted = self
            .store
            .accept_invitation(id)
            .await?
            .ok_or_else(|| ServiceError::conflict("invitation is no longer pending"))?;

        tracing::info!(
            invitation_id = %id,
            group_id = %accepted.group_id,
            invitee = %caller,
            "invitation accepted"
        );
        Ok(accepted)
    }

    pub async fn reject(&self, caller: Uuid, id: Uuid) -> Result<Invitation, ServiceError> {
        let invitation = self.load_for_invitee(caller, id).await?;
        invitation.check_transition(InvitationStatus::Rejected)?;

        let rejected = self
            .store
            .set_invitation_status(id, InvitationStatus::Rejected)
            .await?
            .ok_or_else(|| ServiceError::conflict("invitation is no longer pending"))?;

        tracing::info!(invitation_id = %id, invitee = %caller, "invitation rejected");
        Ok(rejected)
    }

    pub async fn list(&self, caller: Uuid) -> Result<Vec<Invitation>, ServiceError> {
        Ok(self.store.find_invitations_for_user(caller).await?)
    }

    pub async fn get(&self, caller: Uuid, id: Uuid) -> Result<Invitation, ServiceError> {
        let invitation = self.load(id).await?;
        if !invitation.involves(caller) {
            return Err(ServiceError::forbidden(
                "You are not part of this invitation",
            ));
        }
        Ok(invitation)
    }

    /// 邀请人撤回尚未处理的邀请
    pub async fn revoke(&self, caller: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let invitation = self.load(id).await?;
        if invitation.inviter_id != caller {
            return Err(ServiceError::forbidden(
                "Only the inviter can revoke this invitation",
            ));
        }
        if invitation.status != InvitationStatus::Pending
            || !self.store.delete_pending_invitation(id).await?
        {
            return Err(ServiceError::conflict(
                "only pending invitations can be revoked",
            ));
        }

        tracing::info!(invitation_id = %id, inviter = %caller, "invitation revoked");
        Ok(())
    }
}
