use orgusers_core::GroupId;
use orgusers_directory::{Group, WriteMode};

use super::AppServices;
use crate::app::dto::GroupRequest;
use crate::app::errors::ApiError;
use crate::context::CallerContext;

impl AppServices {
    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        Ok(self.store.list_groups().await?)
    }

    pub async fn get_group(&self, id: GroupId) -> Result<Group, ApiError> {
        self.store.get_group(id).await?.ok_or_else(ApiError::not_found)
    }

    pub async fn create_group(&self, caller: &CallerContext, body: GroupRequest) -> Result<Group, ApiError> {
        let changes = body.into_changes()?;
        changes.validate(WriteMode::Create).into_result()?;

        let name = changes.name.unwrap_or_default().trim().to_string();
        let group = self
            .store
            .insert_group(name, changes.permissions.unwrap_or_default())
            .await?;
        tracing::info!(group_id = %group.id, name = %group.name, by = %caller.user_id(), "group created");
        Ok(group)
    }

    pub async fn update_group(
        &self,
        caller: &CallerContext,
        id: GroupId,
        body: GroupRequest,
        mode: WriteMode,
    ) -> Result<Group, ApiError> {
        let mut group = self.get_group(id).await?;
        let changes = body.into_changes()?;
        changes.validate(mode).into_result()?;

        changes.apply_to(&mut group);
        let group = self.store.update_group(group).await?;
        tracing::info!(group_id = %id, by = %caller.user_id(), "group updated");
        Ok(group)
    }

    pub async fn delete_group(&self, caller: &CallerContext, id: GroupId) -> Result<(), ApiError> {
        self.get_group(id).await?;
        self.store.delete_group(id).await?;
        tracing::info!(group_id = %id, by = %caller.user_id(), "group deleted");
        Ok(())
    }
}
