//! Postgres-backed directory store.
//!
//! Every composite write runs in one transaction. Uniqueness is enforced by
//! the schema in `migrations/`, and cascades (memberships, owners, addresses)
//! by its foreign keys.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | StoreError |
//! |------------|-----------------|------------|
//! | unique violation | `23505` | `Duplicate` (entity/field from the constraint name) |
//! | foreign key violation | `23503` | `NotFound` |
//! | anything else | | `Backend` |

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use orgusers_core::{
    EmailAddressId, GroupId, OrganizationId, OrganizationUserId, PermissionId, UserId,
};
use orgusers_directory::{
    EmailAddress, Group, MembershipPlan, Organization, OrganizationFilter, OrganizationOwner,
    OrganizationUser, OwnerChange, User, UserFilter,
};

use super::{DirectoryStore, StoreError, StoreResult, UserUpdate, UserWrite};

const SCHEMA: &str = include_str!("../../migrations/0001_directory.sql");

/// Postgres `DirectoryStore`.
#[derive(Debug, Clone)]
pub struct PostgresDirectoryStore {
    pool: PgPool,
}

impl PostgresDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the directory schema (idempotent).
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn fetch_user(conn: &mut PgConnection, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error("fetch_user", e))?;
        row.map(|r| UserRow::from_row(&r).map(User::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    /// Like `fetch_user`, holding a row lock until the transaction ends.
    async fn lock_user(conn: &mut PgConnection, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error("lock_user", e))?;
        row.map(|r| UserRow::from_row(&r).map(User::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }
}

#[async_trait::async_trait]
impl DirectoryStore for PostgresDirectoryStore {
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let members_of: Option<Vec<Uuid>> = filter
            .members_of
            .as_ref()
            .map(|orgs| orgs.iter().map(|o| *o.as_uuid()).collect());

        let rows = sqlx::query(
            r#"
            SELECT u.*
            FROM users u
            WHERE (
                    ($1::uuid[] IS NULL OR EXISTS (
                        SELECT 1 FROM organization_users m
                        WHERE m.user_id = u.id AND m.organization_id = ANY($1)
                    ))
                    AND (NOT $2 OR NOT u.is_superuser)
                )
                OR u.id = $3
            ORDER BY u.date_joined DESC, u.id DESC
            "#,
        )
        .bind(members_of)
        .bind(filter.exclude_superusers)
        .bind(filter.always_include.map(|u| *u.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        decode_all::<UserRow, User>(&rows, "decode_user")
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        Self::fetch_user(&mut conn, id).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;
        row.map(|r| UserRow::from_row(&r).map(User::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    #[instrument(skip(self, write), fields(user_id = %write.user.id), err)]
    async fn insert_user(&self, write: UserWrite) -> StoreResult<User> {
        let UserWrite { user, memberships, primary_email } = write;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, first_name, last_name, bio, url, company,
                location, phone_number, birth_date, notes, is_active, is_staff,
                is_superuser, groups, user_permissions, password_hash, last_login,
                date_joined
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.url)
        .bind(&user.company)
        .bind(&user.location)
        .bind(&user.phone_number)
        .bind(user.birth_date)
        .bind(&user.notes)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(group_ids(&user.groups))
        .bind(permission_ids(&user.user_permissions))
        .bind(&user.password_hash)
        .bind(user.last_login)
        .bind(user.date_joined)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        apply_plan(&mut tx, user.id, &memberships).await?;
        if let Some(address) = primary_email {
            upsert_address(&mut tx, &address).await?;
        }

        let saved = Self::fetch_user(&mut tx, user.id)
            .await?
            .ok_or(StoreError::NotFound)?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(saved)
    }

    #[instrument(skip(self, update), fields(user_id = %update.id), err)]
    async fn update_user(&self, update: UserUpdate) -> StoreResult<User> {
        let UserUpdate { id, changes, memberships, primary_email } = update;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut user = Self::lock_user(&mut tx, id)
            .await?
            .ok_or(StoreError::NotFound)?;
        changes.apply_to(&mut user);

        sqlx::query(
            r#"
            UPDATE users SET
                username = $2, email = $3, first_name = $4, last_name = $5, bio = $6,
                url = $7, company = $8, location = $9, phone_number = $10,
                birth_date = $11, notes = $12, is_active = $13, is_staff = $14,
                is_superuser = $15, groups = $16, user_permissions = $17
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.url)
        .bind(&user.company)
        .bind(&user.location)
        .bind(&user.phone_number)
        .bind(user.birth_date)
        .bind(&user.notes)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(group_ids(&user.groups))
        .bind(permission_ids(&user.user_permissions))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        apply_plan(&mut tx, id, &memberships).await?;
        if let Some(address) = primary_email {
            if address.user_id != id {
                return Err(StoreError::NotFound);
            }
            upsert_address(&mut tx, &address).await?;
        }

        let saved = Self::fetch_user(&mut tx, id)
            .await?
            .ok_or(StoreError::NotFound)?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(saved)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        expect_one(result.rows_affected())
    }

    async fn set_password(&self, id: UserId, password_hash: String) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password", e))?;
        expect_one(result.rows_affected())
    }

    async fn memberships_of_user(&self, user: UserId) -> StoreResult<Vec<OrganizationUser>> {
        let rows = sqlx::query(
            "SELECT * FROM organization_users WHERE user_id = $1 ORDER BY created, id",
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("memberships_of_user", e))?;
        decode_all::<MembershipRow, OrganizationUser>(&rows, "decode_membership")
    }

    async fn memberships_in(&self, organization: OrganizationId) -> StoreResult<Vec<OrganizationUser>> {
        let rows = sqlx::query(
            "SELECT * FROM organization_users WHERE organization_id = $1 ORDER BY created, id",
        )
        .bind(organization.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("memberships_in", e))?;
        decode_all::<MembershipRow, OrganizationUser>(&rows, "decode_membership")
    }

    async fn list_organizations(&self, filter: &OrganizationFilter) -> StoreResult<Vec<Organization>> {
        let only: Option<Vec<Uuid>> = match filter {
            OrganizationFilter::All => None,
            OrganizationFilter::Only(ids) => Some(ids.iter().map(|o| *o.as_uuid()).collect()),
        };
        let rows = sqlx::query(
            r#"
            SELECT * FROM organizations
            WHERE $1::uuid[] IS NULL OR id = ANY($1)
            ORDER BY created DESC, id DESC
            "#,
        )
        .bind(only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_organizations", e))?;
        decode_all::<OrganizationRow, Organization>(&rows, "decode_organization")
    }

    async fn get_organization(&self, id: OrganizationId) -> StoreResult<Option<Organization>> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_organization", e))?;
        row.map(|r| OrganizationRow::from_row(&r).map(Organization::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_organization", e))
    }

    async fn owner_of(&self, organization: OrganizationId) -> StoreResult<Option<OrganizationOwner>> {
        let row = sqlx::query(
            "SELECT organization_user_id FROM organization_owners WHERE organization_id = $1",
        )
        .bind(organization.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("owner_of", e))?;

        row.map(|r| {
            r.try_get::<Uuid, _>("organization_user_id")
                .map(|membership| OrganizationOwner {
                    organization_id: organization,
                    organization_user_id: OrganizationUserId::from_uuid(membership),
                })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("decode_owner", e))
    }

    #[instrument(skip(self, organization), fields(organization_id = %organization.id), err)]
    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization> {
        sqlx::query(
            r#"
            INSERT INTO organizations (
                id, name, slug, is_active, description, email, url, created, modified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.slug)
        .bind(organization.is_active)
        .bind(&organization.description)
        .bind(&organization.email)
        .bind(&organization.url)
        .bind(organization.created)
        .bind(organization.modified)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_organization", e))?;
        Ok(organization)
    }

    #[instrument(skip(self, organization), fields(organization_id = %organization.id), err)]
    async fn update_organization(
        &self,
        organization: Organization,
        owner: OwnerChange,
    ) -> StoreResult<Organization> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE organizations SET
                name = $2, slug = $3, is_active = $4, description = $5, email = $6,
                url = $7, modified = $8
            WHERE id = $1
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.slug)
        .bind(organization.is_active)
        .bind(&organization.description)
        .bind(&organization.email)
        .bind(&organization.url)
        .bind(organization.modified)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_organization", e))?;
        expect_one(result.rows_affected())?;

        match owner {
            OwnerChange::Unchanged => {}
            OwnerChange::Clear => {
                sqlx::query("DELETE FROM organization_owners WHERE organization_id = $1")
                    .bind(organization.id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("clear_owner", e))?;
            }
            OwnerChange::Assign(membership) => {
                let belongs = sqlx::query(
                    "SELECT 1 FROM organization_users WHERE id = $1 AND organization_id = $2",
                )
                .bind(membership.as_uuid())
                .bind(organization.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_owner", e))?;
                if belongs.is_none() {
                    return Err(StoreError::NotFound);
                }

                sqlx::query(
                    r#"
                    INSERT INTO organization_owners (organization_id, organization_user_id)
                    VALUES ($1, $2)
                    ON CONFLICT (organization_id)
                    DO UPDATE SET organization_user_id = EXCLUDED.organization_user_id
                    "#,
                )
                .bind(organization.id.as_uuid())
                .bind(membership.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("assign_owner", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(organization)
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn delete_organization(&self, id: OrganizationId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_organization", e))?;
        expect_one(result.rows_affected())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let rows = sqlx::query("SELECT * FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_groups", e))?;
        decode_all::<GroupRow, Group>(&rows, "decode_group")
    }

    async fn get_group(&self, id: GroupId) -> StoreResult<Option<Group>> {
        let row = sqlx::query("SELECT * FROM groups WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_group", e))?;
        row.map(|r| GroupRow::from_row(&r).map(Group::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_group", e))
    }

    #[instrument(skip(self, permissions), err)]
    async fn insert_group(
        &self,
        name: String,
        permissions: BTreeSet<PermissionId>,
    ) -> StoreResult<Group> {
        let row = sqlx::query("INSERT INTO groups (name, permissions) VALUES ($1, $2) RETURNING id")
            .bind(&name)
            .bind(permission_ids(&permissions))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_group", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("decode_group", e))?;
        Ok(Group {
            id: GroupId::new(id),
            name,
            permissions,
        })
    }

    #[instrument(skip(self, group), fields(group_id = %group.id), err)]
    async fn update_group(&self, group: Group) -> StoreResult<Group> {
        let result = sqlx::query("UPDATE groups SET name = $2, permissions = $3 WHERE id = $1")
            .bind(group.id.get())
            .bind(&group.name)
            .bind(permission_ids(&group.permissions))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_group", e))?;
        expect_one(result.rows_affected())?;
        Ok(group)
    }

    #[instrument(skip(self), fields(group_id = %id), err)]
    async fn delete_group(&self, id: GroupId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_group", e))?;
        expect_one(result.rows_affected())?;

        sqlx::query("UPDATE users SET groups = array_remove(groups, $1) WHERE $1 = ANY(groups)")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("detach_group", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn email_addresses(&self, user: UserId) -> StoreResult<Vec<EmailAddress>> {
        let rows = sqlx::query("SELECT * FROM email_addresses WHERE user_id = $1 ORDER BY id")
            .bind(user.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("email_addresses", e))?;
        decode_all::<EmailAddressRow, EmailAddress>(&rows, "decode_email_address")
    }

    #[instrument(skip(self, address), fields(user_id = %address.user_id), err)]
    async fn save_email_address(&self, address: EmailAddress) -> StoreResult<EmailAddress> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let saved = upsert_address(&mut tx, &address).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(saved)
    }

    async fn delete_email_addresses(&self, user: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM email_addresses WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_email_addresses", e))?;
        Ok(())
    }
}

// ───────────────────────── write helpers ─────────────────────────

async fn apply_plan(
    conn: &mut PgConnection,
    user: UserId,
    plan: &MembershipPlan,
) -> StoreResult<()> {
    for id in &plan.delete {
        // The owner row goes with the membership (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM organization_users WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user.as_uuid())
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("delete_membership", e))?;
        expect_one(result.rows_affected())?;
    }

    for (id, is_admin) in &plan.update {
        let result = sqlx::query(
            "UPDATE organization_users SET is_admin = $3, modified = $4 WHERE id = $1 AND user_id = $2",
        )
        .bind(id.as_uuid())
        .bind(user.as_uuid())
        .bind(*is_admin)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_membership", e))?;
        expect_one(result.rows_affected())?;
    }

    for m in &plan.create {
        sqlx::query(
            r#"
            INSERT INTO organization_users (id, user_id, organization_id, is_admin, created, modified)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(m.id.as_uuid())
        .bind(m.user_id.as_uuid())
        .bind(m.organization_id.as_uuid())
        .bind(m.is_admin)
        .bind(m.created)
        .bind(m.modified)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_membership", e))?;
    }

    Ok(())
}

async fn upsert_address(conn: &mut PgConnection, address: &EmailAddress) -> StoreResult<EmailAddress> {
    let mut address = address.clone();
    address.email = address.email.trim().to_lowercase();

    if address.primary {
        sqlx::query(
            r#"UPDATE email_addresses SET "primary" = FALSE WHERE user_id = $1 AND id <> $2"#,
        )
        .bind(address.user_id.as_uuid())
        .bind(address.id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("demote_addresses", e))?;

        let result = sqlx::query("UPDATE users SET email = $2 WHERE id = $1")
            .bind(address.user_id.as_uuid())
            .bind(&address.email)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("sync_user_email", e))?;
        expect_one(result.rows_affected())?;
    }

    sqlx::query(
        r#"
        INSERT INTO email_addresses (id, user_id, email, verified, "primary")
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id)
        DO UPDATE SET
            email = EXCLUDED.email,
            verified = EXCLUDED.verified,
            "primary" = EXCLUDED."primary"
        "#,
    )
    .bind(address.id.as_uuid())
    .bind(address.user_id.as_uuid())
    .bind(&address.email)
    .bind(address.verified)
    .bind(address.primary)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("upsert_address", e))?;

    Ok(address)
}

fn expect_one(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

fn group_ids(ids: &BTreeSet<GroupId>) -> Vec<i64> {
    ids.iter().map(GroupId::get).collect()
}

fn permission_ids(ids: &BTreeSet<PermissionId>) -> Vec<i64> {
    ids.iter().map(PermissionId::get).collect()
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => {
                let (entity, field) = match db_err.constraint() {
                    Some("users_username_key") => ("user", "username"),
                    Some("users_email_key") => ("user", "email"),
                    Some("organizations_slug_key") => ("organization", "slug"),
                    Some("organization_users_member_key") => ("organization user", "organization"),
                    Some("groups_name_key") => ("group", "name"),
                    _ => ("record", "id"),
                };
                return StoreError::duplicate(entity, field);
            }
            Some("23503") => return StoreError::NotFound,
            _ => {}
        }
    }
    StoreError::Backend(format!("{operation}: {err}"))
}

fn decode_all<R, T>(rows: &[PgRow], operation: &str) -> StoreResult<Vec<T>>
where
    R: for<'r> FromRow<'r, PgRow>,
    T: From<R>,
{
    rows.iter()
        .map(|r| R::from_row(r).map(T::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error(operation, e))
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    bio: String,
    url: String,
    company: String,
    location: String,
    phone_number: Option<String>,
    birth_date: Option<NaiveDate>,
    notes: String,
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    groups: Vec<i64>,
    user_permissions: Vec<i64>,
    password_hash: String,
    last_login: Option<DateTime<Utc>>,
    date_joined: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            bio: row.try_get("bio")?,
            url: row.try_get("url")?,
            company: row.try_get("company")?,
            location: row.try_get("location")?,
            phone_number: row.try_get("phone_number")?,
            birth_date: row.try_get("birth_date")?,
            notes: row.try_get("notes")?,
            is_active: row.try_get("is_active")?,
            is_staff: row.try_get("is_staff")?,
            is_superuser: row.try_get("is_superuser")?,
            groups: row.try_get("groups")?,
            user_permissions: row.try_get("user_permissions")?,
            password_hash: row.try_get("password_hash")?,
            last_login: row.try_get("last_login")?,
            date_joined: row.try_get("date_joined")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            url: row.url,
            company: row.company,
            location: row.location,
            phone_number: row.phone_number,
            birth_date: row.birth_date,
            notes: row.notes,
            is_active: row.is_active,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            groups: row.groups.into_iter().map(GroupId::new).collect(),
            user_permissions: row.user_permissions.into_iter().map(PermissionId::new).collect(),
            password_hash: row.password_hash,
            last_login: row.last_login,
            date_joined: row.date_joined,
        }
    }
}

#[derive(Debug)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    slug: String,
    is_active: bool,
    description: String,
    email: String,
    url: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrganizationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrganizationRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            is_active: row.try_get("is_active")?,
            description: row.try_get("description")?,
            email: row.try_get("email")?,
            url: row.try_get("url")?,
            created: row.try_get("created")?,
            modified: row.try_get("modified")?,
        })
    }
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: OrganizationId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            is_active: row.is_active,
            description: row.description,
            email: row.email,
            url: row.url,
            created: row.created,
            modified: row.modified,
        }
    }
}

#[derive(Debug)]
struct MembershipRow {
    id: Uuid,
    user_id: Uuid,
    organization_id: Uuid,
    is_admin: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MembershipRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MembershipRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            organization_id: row.try_get("organization_id")?,
            is_admin: row.try_get("is_admin")?,
            created: row.try_get("created")?,
            modified: row.try_get("modified")?,
        })
    }
}

impl From<MembershipRow> for OrganizationUser {
    fn from(row: MembershipRow) -> Self {
        OrganizationUser {
            id: OrganizationUserId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            is_admin: row.is_admin,
            created: row.created,
            modified: row.modified,
        }
    }
}

#[derive(Debug)]
struct GroupRow {
    id: i64,
    name: String,
    permissions: Vec<i64>,
}

impl<'r> FromRow<'r, PgRow> for GroupRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(GroupRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            permissions: row.try_get("permissions")?,
        })
    }
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: GroupId::new(row.id),
            name: row.name,
            permissions: row.permissions.into_iter().map(PermissionId::new).collect(),
        }
    }
}

#[derive(Debug)]
struct EmailAddressRow {
    id: Uuid,
    user_id: Uuid,
    email: String,
    verified: bool,
    primary: bool,
}

impl<'r> FromRow<'r, PgRow> for EmailAddressRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EmailAddressRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            email: row.try_get("email")?,
            verified: row.try_get("verified")?,
            primary: row.try_get("primary")?,
        })
    }
}

impl From<EmailAddressRow> for EmailAddress {
    fn from(row: EmailAddressRow) -> Self {
        EmailAddress {
            id: EmailAddressId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            email: row.email,
            verified: row.verified,
            primary: row.primary,
        }
    }
}
