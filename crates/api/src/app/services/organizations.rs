use chrono::Utc;

use orgusers_core::OrganizationId;
use orgusers_directory::{plan_owner, Organization, OwnerChange, WriteMode};

use super::{AppServices, OrganizationView};
use crate::app::dto::OrganizationRequest;
use crate::app::errors::ApiError;
use crate::context::CallerContext;

impl AppServices {
    pub async fn list_organizations(&self, caller: &CallerContext) -> Result<Vec<OrganizationView>, ApiError> {
        let organizations = self
            .store
            .list_organizations(&caller.scope().organization_filter())
            .await?;

        let mut out = Vec::with_capacity(organizations.len());
        for organization in organizations {
            out.push(self.organization_view(organization).await?);
        }
        Ok(out)
    }

    pub async fn get_organization(
        &self,
        caller: &CallerContext,
        id: OrganizationId,
    ) -> Result<OrganizationView, ApiError> {
        let organization = self.visible_organization(caller, id).await?;
        self.organization_view(organization).await
    }

    pub async fn create_organization(
        &self,
        caller: &CallerContext,
        body: OrganizationRequest,
    ) -> Result<OrganizationView, ApiError> {
        let (changes, owner) = body.into_parts()?;
        changes.validate(WriteMode::Create).into_result()?;

        let now = Utc::now();
        let organization = Organization::create(changes, now);
        // A new organization has no members yet, so only an empty owner is valid.
        plan_owner(organization.id, owner, &[])?;

        let organization = self.store.insert_organization(organization).await?;
        tracing::info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            by = %caller.user_id(),
            "organization created"
        );
        Ok(OrganizationView {
            organization,
            owner: None,
        })
    }

    pub async fn update_organization(
        &self,
        caller: &CallerContext,
        id: OrganizationId,
        body: OrganizationRequest,
        mode: WriteMode,
    ) -> Result<OrganizationView, ApiError> {
        let mut organization = self.visible_organization(caller, id).await?;
        let (changes, owner) = body.into_parts()?;
        changes.validate(mode).into_result()?;

        let owner = match owner {
            None => OwnerChange::Unchanged,
            requested => {
                let members = self.store.memberships_in(id).await?;
                plan_owner(id, requested, &members)?
            }
        };

        changes.apply_to(&mut organization, Utc::now());
        let organization = self.store.update_organization(organization, owner).await?;
        tracing::info!(organization_id = %id, by = %caller.user_id(), "organization updated");
        self.organization_view(organization).await
    }

    pub async fn delete_organization(&self, caller: &CallerContext, id: OrganizationId) -> Result<(), ApiError> {
        self.visible_organization(caller, id).await?;
        self.store.delete_organization(id).await?;
        tracing::info!(organization_id = %id, by = %caller.user_id(), "organization deleted");
        Ok(())
    }

    /// The organization, or 404 when it is missing or outside the caller's scope.
    async fn visible_organization(&self, caller: &CallerContext, id: OrganizationId) -> Result<Organization, ApiError> {
        if !caller.scope().manages(id) {
            return Err(ApiError::not_found());
        }
        self.store
            .get_organization(id)
            .await?
            .ok_or_else(ApiError::not_found)
    }

    async fn organization_view(&self, organization: Organization) -> Result<OrganizationView, ApiError> {
        let owner = self.store.owner_of(organization.id).await?;
        Ok(OrganizationView { organization, owner })
    }
}
