use std::collections::BTreeSet;

use chrono::Utc;

use orgusers_core::{FieldErrors, UserId};
use orgusers_directory::validate::{BLANK, REQUIRED};
use orgusers_directory::{plan_memberships, EmailAddress, User, UserChanges, UserFilter, WriteMode};
use orgusers_infra::{UserUpdate, UserWrite};

use super::{AppServices, UserView};
use crate::app::dto::UserRequest;
use crate::app::errors::ApiError;
use crate::app::gate::FieldSet;
use crate::context::CallerContext;

impl AppServices {
    pub async fn list_users(&self, caller: &CallerContext) -> Result<Vec<UserView>, ApiError> {
        let users = self.store.list_users(&caller.scope().user_filter()).await?;
        let mut out = Vec::with_capacity(users.len());
        for user in users {
            out.push(self.user_view(user).await?);
        }
        Ok(out)
    }

    pub async fn get_user(&self, caller: &CallerContext, id: UserId) -> Result<UserView, ApiError> {
        let user = self.visible_user(id, &caller.scope().user_filter()).await?;
        self.user_view(user).await
    }

    pub async fn create_user(&self, caller: &CallerContext, body: UserRequest) -> Result<UserView, ApiError> {
        let mut input = body.into_input()?;
        FieldSet::for_caller(caller).strip_read_only(&mut input.changes);

        let mut errors = input.changes.validate(WriteMode::Create);
        match input.password.as_deref() {
            None => errors.add("password", REQUIRED),
            Some("") => errors.add("password", BLANK),
            Some(_) => {}
        }
        errors.into_result()?;
        self.ensure_groups_exist(&input.changes).await?;

        let password = input.password.unwrap_or_default();
        let now = Utc::now();
        let user = User::create(input.changes, self.hasher.hash(&password)?, now);

        let editable = self.editable_organizations(caller).await?;
        let memberships = plan_memberships(
            user.id,
            &[],
            input.memberships.as_deref(),
            |org| editable.contains(&org),
            now,
        )?;
        let primary_email = (!user.email.is_empty())
            .then(|| EmailAddress::new(user.id, user.email.clone(), false, true));

        let user = self
            .store
            .insert_user(UserWrite {
                user,
                memberships,
                primary_email,
            })
            .await?;
        tracing::info!(user_id = %user.id, username = %user.username, by = %caller.user_id(), "user created");
        self.user_view(user).await
    }

    /// Update profile fields and apply the nested membership toggles in one
    /// write. A `password` in the body is ignored.
    pub async fn update_user(
        &self,
        caller: &CallerContext,
        id: UserId,
        body: UserRequest,
        mode: WriteMode,
    ) -> Result<UserView, ApiError> {
        let user = self.visible_user(id, &caller.scope().user_filter()).await?;

        let mut input = body.into_input()?;
        FieldSet::for_caller(caller).strip_read_only(&mut input.changes);
        input.changes.validate(mode).into_result()?;
        self.ensure_groups_exist(&input.changes).await?;

        let primary_email = if input.changes.changes_email(&user) {
            let email = input.changes.email.clone().unwrap_or_default();
            let addresses = self.store.email_addresses(id).await?;
            let mut address = addresses
                .iter()
                .find(|a| a.primary)
                .cloned()
                .unwrap_or_else(|| EmailAddress::new(id, String::new(), false, true));
            address.email = email.trim().to_lowercase();
            address.verified = false;
            Some(address)
        } else {
            None
        };

        let now = Utc::now();
        let existing = self.store.memberships_of_user(id).await?;
        let editable = self.editable_organizations(caller).await?;
        let memberships = plan_memberships(
            id,
            &existing,
            input.memberships.as_deref(),
            |org| editable.contains(&org),
            now,
        )?;

        let user = self
            .store
            .update_user(UserUpdate {
                id,
                changes: input.changes,
                memberships,
                primary_email,
            })
            .await?;
        tracing::info!(user_id = %id, by = %caller.user_id(), "user updated");
        self.user_view(user).await
    }

    pub async fn delete_user(&self, caller: &CallerContext, id: UserId) -> Result<(), ApiError> {
        self.visible_user(id, &caller.scope().user_filter()).await?;
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, by = %caller.user_id(), "user deleted");
        Ok(())
    }

    /// The user, or 404 when it is missing or not matched by `filter`.
    pub(crate) async fn visible_user(&self, id: UserId, filter: &UserFilter) -> Result<User, ApiError> {
        let user = self.store.get_user(id).await?.ok_or_else(ApiError::not_found)?;
        let organizations: BTreeSet<_> = self
            .store
            .memberships_of_user(id)
            .await?
            .into_iter()
            .map(|m| m.organization_id)
            .collect();

        if filter.matches(&user, &organizations) {
            Ok(user)
        } else {
            Err(ApiError::not_found())
        }
    }

    async fn ensure_groups_exist(&self, changes: &UserChanges) -> Result<(), ApiError> {
        let Some(groups) = &changes.groups else {
            return Ok(());
        };
        let mut errors = FieldErrors::new();
        for id in groups {
            if self.store.get_group(*id).await?.is_none() {
                errors.add("groups", format!("Invalid pk \"{id}\" - object does not exist."));
            }
        }
        Ok(errors.into_result()?)
    }

    async fn user_view(&self, user: User) -> Result<UserView, ApiError> {
        let memberships = self.store.memberships_of_user(user.id).await?;
        Ok(UserView { user, memberships })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use orgusers_core::{DomainError, OrganizationId};
    use orgusers_directory::{Organization, OrganizationUser};
    use orgusers_infra::{ensure_default_groups, StoreError};

    use super::*;
    use crate::app::dto::decode;
    use crate::app::services::testing;

    fn request(body: serde_json::Value) -> UserRequest {
        decode(body).unwrap()
    }

    struct World {
        services: AppServices,
        admin: CallerContext,
        org1: Organization,
        org2: Organization,
    }

    async fn world() -> World {
        let services = testing::services();
        ensure_default_groups(services.store().as_ref()).await.unwrap();

        let mut admin = User::new("admin", "admin@test.com", "", Utc::now());
        admin.is_superuser = true;
        services.store().insert_user(UserWrite::new(admin.clone())).await.unwrap();

        let org1 = services
            .store()
            .insert_organization(Organization::new("org1", "org1", Utc::now()))
            .await
            .unwrap();
        let org2 = services
            .store()
            .insert_organization(Organization::new("org2", "org2", Utc::now()))
            .await
            .unwrap();

        let admin = testing::caller(&services, &admin).await;
        World { services, admin, org1, org2 }
    }

    async fn manager_of(world: &World, org: OrganizationId) -> CallerContext {
        let manager = world
            .services
            .create_user(
                &world.admin,
                request(json!({
                    "username": "manager",
                    "email": "manager@test.com",
                    "password": "tester",
                    "organization_users": { "organization": org.to_string(), "is_admin": true },
                })),
            )
            .await
            .unwrap();
        testing::caller(&world.services, &manager.user).await
    }

    #[tokio::test]
    async fn create_hashes_password_and_records_primary_email() {
        let w = world().await;
        let view = w
            .services
            .create_user(
                &w.admin,
                request(json!({
                    "username": "tester",
                    "email": "Tester@Test.com",
                    "password": "password123",
                    "groups": [1],
                })),
            )
            .await
            .unwrap();

        assert_ne!(view.user.password_hash, "password123");
        assert_eq!(view.user.email, "tester@test.com");
        let addresses = w.services.store().email_addresses(view.user.id).await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert!(addresses[0].primary && !addresses[0].verified);
    }

    #[tokio::test]
    async fn create_requires_password_and_known_groups() {
        let w = world().await;
        let err = w
            .services
            .create_user(&w.admin, request(json!({ "username": "tester", "email": "t@test.com" })))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Domain(DomainError::Validation(ref f)) if f.contains("password")));

        let err = w
            .services
            .create_user(
                &w.admin,
                request(json!({ "username": "tester", "email": "t@test.com", "password": "x", "groups": [42] })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Domain(DomainError::Validation(ref f)) if f.contains("groups")));
    }

    #[tokio::test]
    async fn duplicate_username_is_reported_by_the_store() {
        let w = world().await;
        let err = w
            .services
            .create_user(
                &w.admin,
                request(json!({ "username": "admin", "email": "other@test.com", "password": "x" })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Store(StoreError::Duplicate { field: "username", .. })));
    }

    #[tokio::test]
    async fn membership_toggles_create_update_and_remove() {
        let w = world().await;
        let view = w
            .services
            .create_user(
                &w.admin,
                request(json!({ "username": "tester", "email": "t@test.com", "password": "x" })),
            )
            .await
            .unwrap();
        let id = view.user.id;
        let toggle = |org: &Organization, is_admin: bool| {
            request(json!({ "organization_users": [{ "organization": org.id.to_string(), "is_admin": is_admin }] }))
        };

        let view = w.services.update_user(&w.admin, id, toggle(&w.org1, false), WriteMode::Partial).await.unwrap();
        assert_eq!(view.memberships.len(), 1);
        assert!(!view.memberships[0].is_admin);

        let view = w.services.update_user(&w.admin, id, toggle(&w.org1, true), WriteMode::Partial).await.unwrap();
        assert!(view.memberships[0].is_admin);

        let view = w.services.update_user(&w.admin, id, toggle(&w.org1, true), WriteMode::Partial).await.unwrap();
        assert!(view.memberships.is_empty());
    }

    #[tokio::test]
    async fn manager_edits_only_managed_memberships() {
        let w = world().await;
        let manager = manager_of(&w, w.org1.id).await;

        let view = w
            .services
            .create_user(
                &w.admin,
                request(json!({
                    "username": "member",
                    "email": "member@test.com",
                    "password": "x",
                    "organization_users": [
                        { "organization": w.org1.id.to_string() },
                        { "organization": w.org2.id.to_string() },
                    ],
                })),
            )
            .await
            .unwrap();
        let id = view.user.id;

        let err = w
            .services
            .update_user(
                &manager,
                id,
                request(json!({ "organization_users": [{ "organization": w.org2.id.to_string(), "is_admin": true }] })),
                WriteMode::Partial,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Domain(DomainError::Validation(_))));

        let view = w
            .services
            .update_user(&manager, id, request(json!({ "organization_users": [] })), WriteMode::Partial)
            .await
            .unwrap();
        let remaining: Vec<_> = view.memberships.iter().map(|m: &OrganizationUser| m.organization_id).collect();
        assert_eq!(remaining, vec![w.org2.id]);
    }

    #[tokio::test]
    async fn manager_cannot_grant_superuser_or_see_strangers() {
        let w = world().await;
        let manager = manager_of(&w, w.org1.id).await;

        let view = w
            .services
            .create_user(
                &manager,
                request(json!({
                    "username": "member",
                    "email": "member@test.com",
                    "password": "x",
                    "is_superuser": true,
                    "user_permissions": [1],
                    "organization_users": { "organization": w.org1.id.to_string() },
                })),
            )
            .await
            .unwrap();
        assert!(!view.user.is_superuser);
        assert!(view.user.user_permissions.is_empty());

        let visible: Vec<_> = w
            .services
            .list_users(&manager)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.user.username)
            .collect();
        assert_eq!(visible, ["member", "manager"]);

        let admin_id = w.admin.user_id();
        assert!(matches!(
            w.services.get_user(&manager, admin_id).await,
            Err(ApiError::Domain(DomainError::NotFound))
        ));
    }

    #[tokio::test]
    async fn email_change_resets_primary_address_verification() {
        let w = world().await;
        let view = w
            .services
            .create_user(
                &w.admin,
                request(json!({ "username": "tester", "email": "old@test.com", "password": "x" })),
            )
            .await
            .unwrap();
        let id = view.user.id;
        let mut primary = w.services.store().email_addresses(id).await.unwrap().remove(0);
        primary.verified = true;
        w.services.store().save_email_address(primary).await.unwrap();

        let view = w
            .services
            .update_user(&w.admin, id, request(json!({ "email": "new@test.com", "password": "ignored" })), WriteMode::Partial)
            .await
            .unwrap();
        assert_eq!(view.user.email, "new@test.com");

        let addresses = w.services.store().email_addresses(id).await.unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].email, "new@test.com");
        assert!(addresses[0].primary && !addresses[0].verified);
    }

    #[tokio::test]
    async fn update_never_touches_the_password_hash() {
        let w = world().await;
        let view = w
            .services
            .create_user(
                &w.admin,
                request(json!({ "username": "tester", "email": "t@test.com", "password": "x" })),
            )
            .await
            .unwrap();
        let id = view.user.id;
        w.services.store().set_password(id, "new-hash".into()).await.unwrap();

        let view = w
            .services
            .update_user(&w.admin, id, request(json!({ "first_name": "Tester", "password": "y" })), WriteMode::Partial)
            .await
            .unwrap();
        assert_eq!(view.user.first_name, "Tester");
        assert_eq!(view.user.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn delete_cascades_memberships() {
        let w = world().await;
        let view = w
            .services
            .create_user(
                &w.admin,
                request(json!({
                    "username": "tester",
                    "email": "t@test.com",
                    "password": "x",
                    "organization_users": [{ "organization": w.org1.id.to_string() }],
                })),
            )
            .await
            .unwrap();

        w.services.delete_user(&w.admin, view.user.id).await.unwrap();
        assert!(w.services.store().memberships_in(w.org1.id).await.unwrap().is_empty());
        assert!(w.services.get_user(&w.admin, view.user.id).await.is_err());
    }
}
