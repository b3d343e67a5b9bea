//! Organization memberships, ownership, and the nested-write plans that
//! change them together with their parent resource.
//!
//! Planning is pure: the functions here compute *what* must change, and the
//! store applies a plan in the same transaction as the parent write.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use orgusers_core::{DomainError, DomainResult, Entity, OrganizationId, OrganizationUserId, UserId};

/// A user's membership in an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationUser {
    pub id: OrganizationUserId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub is_admin: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl OrganizationUser {
    pub fn new(
        user_id: UserId,
        organization_id: OrganizationId,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrganizationUserId::new(),
            user_id,
            organization_id,
            is_admin,
            created: now,
            modified: now,
        }
    }
}

impl Entity for OrganizationUser {
    type Id = OrganizationUserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created
    }
}

/// The membership that owns an organization (at most one per organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationOwner {
    pub organization_id: OrganizationId,
    pub organization_user_id: OrganizationUserId,
}

/// One requested membership inside a user write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipInput {
    pub organization: OrganizationId,
    pub is_admin: bool,
}

/// Membership changes to apply alongside a user write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    pub create: Vec<OrganizationUser>,
    pub update: Vec<(OrganizationUserId, bool)>,
    pub delete: Vec<OrganizationUserId>,
}

impl MembershipPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

const MEMBERSHIPS_FIELD: &str = "organization_users";

/// Plan the membership side of a user write.
///
/// - `requested == None`: memberships are left alone.
/// - empty list: every existing membership in an editable organization goes.
/// - per entry, keyed by organization:
///   - no membership yet → create it;
///   - membership with a different `is_admin` → update the flag;
///   - membership with the same `is_admin` → remove it.
///
/// `editable` decides which organizations the caller may reference; any
/// other organization is rejected as if it did not exist.
pub fn plan_memberships(
    user_id: UserId,
    existing: &[OrganizationUser],
    requested: Option<&[MembershipInput]>,
    editable: impl Fn(OrganizationId) -> bool,
    now: DateTime<Utc>,
) -> DomainResult<MembershipPlan> {
    let Some(requested) = requested else {
        return Ok(MembershipPlan::default());
    };

    let mut plan = MembershipPlan::default();

    if requested.is_empty() {
        plan.delete = existing
            .iter()
            .filter(|m| editable(m.organization_id))
            .map(|m| m.id)
            .collect();
        return Ok(plan);
    }

    let current: HashMap<OrganizationId, &OrganizationUser> =
        existing.iter().map(|m| (m.organization_id, m)).collect();
    let mut seen: BTreeSet<OrganizationId> = BTreeSet::new();

    for input in requested {
        if !editable(input.organization) {
            return Err(DomainError::field(
                MEMBERSHIPS_FIELD,
                format!("Invalid pk \"{}\" - object does not exist.", input.organization),
            ));
        }
        if !seen.insert(input.organization) {
            return Err(DomainError::field(
                MEMBERSHIPS_FIELD,
                format!("Organization \"{}\" is listed more than once.", input.organization),
            ));
        }

        match current.get(&input.organization) {
            None => plan.create.push(OrganizationUser::new(
                user_id,
                input.organization,
                input.is_admin,
                now,
            )),
            Some(m) if m.is_admin != input.is_admin => plan.update.push((m.id, input.is_admin)),
            Some(m) => plan.delete.push(m.id),
        }
    }

    Ok(plan)
}

/// Ownership change requested by an organization write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerChange {
    Unchanged,
    Clear,
    Assign(OrganizationUserId),
}

/// Plan the owner side of an organization write.
///
/// `requested`: `None` leaves the owner alone, `Some(None)` clears it, and
/// `Some(Some(id))` makes that membership the owner. The membership must
/// belong to `organization`.
pub fn plan_owner(
    organization: OrganizationId,
    requested: Option<Option<OrganizationUserId>>,
    members: &[OrganizationUser],
) -> DomainResult<OwnerChange> {
    match requested {
        None => Ok(OwnerChange::Unchanged),
        Some(None) => Ok(OwnerChange::Clear),
        Some(Some(id)) => {
            let belongs = members
                .iter()
                .any(|m| m.id == id && m.organization_id == organization);
            if belongs {
                Ok(OwnerChange::Assign(id))
            } else {
                Err(DomainError::field(
                    "owner.organization_user",
                    format!("Invalid pk \"{id}\" - object does not exist."),
                ))
            }
        }
    }
}
