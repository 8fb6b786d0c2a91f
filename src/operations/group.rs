// 群组操作

use std::sync::Arc;

use uuid::Uuid;

use super::caller_groups;
use crate::access::can_read;
use crate::error::{FieldErrors, ServiceError};
use crate::models::{Group, is_blank};
use crate::store::DocumentStore;

const MAX_GROUP_NAME_CHARS: usize = 64;

pub struct GroupOperation {
    store: Arc<dyn DocumentStore>,
}

impl GroupOperation {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: Uuid) -> Result<Group, ServiceError> {
        self.store
            .find_group(id)
            .await?
            .ok_or(ServiceError::NotFound("Group"))
    }

    pub async fn create(&self, creator: Uuid, name: Option<String>) -> Result<Group, ServiceError> {
        let mut errors = FieldErrors::new();
        if is_blank(name.as_deref()) {
            errors.push("name", "must not be empty");
        } else if name.as_deref().is_some_and(|n| n.trim().chars().count() > MAX_GROUP_NAME_CHARS) {
            errors.push("name", format!("must be at most {MAX_GROUP_NAME_CHARS} characters"));
        }
        errors.into_result()?;

        let name = name.unwrap_or_default().trim().to_string();
        let group = Group::new(name, creator);
        self.store.insert_group(&group).await?;

        tracing::info!(group_id = %group.id, %creator, "group created");
        Ok(group)
    }

    pub async fn list_for_member(&self, caller: Uuid) -> Result<Vec<Group>, ServiceError> {
        Ok(self.store.find_groups_by_member(caller).await?)
    }

    /// 只有成员可以查看群组详情
    pub async fn get(&self, caller: Uuid, id: Uuid) -> Result<Group, ServiceError> {
        let group = self.load(id).await?;
        if !group.is_member(caller) {
            return Err(ServiceError::forbidden("You are not a member of this group"));
        }
        Ok(group)
    }

    /// 幂等，重复加入不会产生重复成员
    pub async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<Group, ServiceError> {
        let group = self
            .store
            .add_group_member(group_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound("Group"))?;

        tracing::info!(%group_id, %user_id, "member added to group");
        Ok(group)
    }

    pub async fn join(&self, caller: Uuid, group_id: Uuid) -> Result<Group, ServiceError> {
        self.add_member(group_id, caller).await
    }

    /// 成员可以把自己能看到的地点关联到群组
    pub async fn attach_location(
        &self,
        caller: Uuid,
        group_id: Uuid,
        location_id: Uuid,
    ) -> Result<Group, ServiceError> {
        let group = self.load(group_id).await?;
        let location = self
            .store
            .find_location(location_id)
            .await?
            .ok_or(ServiceError::NotFound("Location"))?;

        if !group.is_member(caller) {
            return Err(ServiceError::forbidden("You are not a member of this group"));
        }
        let groups = caller_groups(self.store.as_ref(), caller).await?;
        if !can_read(caller, &location, &groups) {
            return Err(ServiceError::forbidden(
                "You do not have access to this location",
            ));
        }

        let group = self
            .store
            .add_group_location(group_id, location_id)
            .await?
            .ok_or(ServiceError::NotFound("Group"))?;
        tracing::info!(%group_id, %location_id, "location attached to group");
        Ok(group)
    }
}
