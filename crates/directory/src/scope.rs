//! Access scope: which organizations and users a caller may see or edit.
//!
//! - Superusers see everything.
//! - Everyone else sees the organizations they administer ("managed"
//!   organizations) and the non-superuser members of those organizations.
//! - A plain member administers nothing and therefore sees nothing.
//!
//! Records outside the scope are reported as missing, never as forbidden.

use std::collections::{BTreeSet, HashMap};

use orgusers_core::{entity, OrganizationId, UserId};

use crate::{Organization, OrganizationUser, User};

/// The resolved scope of one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerScope {
    caller: UserId,
    is_superuser: bool,
    managed: BTreeSet<OrganizationId>,
}

impl CallerScope {
    /// Resolve from the caller's account and memberships. Memberships of
    /// other users are ignored.
    pub fn resolve(caller: &User, memberships: &[OrganizationUser]) -> Self {
        let managed = memberships
            .iter()
            .filter(|m| m.user_id == caller.id && m.is_admin)
            .map(|m| m.organization_id)
            .collect();

        Self {
            caller: caller.id,
            is_superuser: caller.is_superuser,
            managed,
        }
    }

    pub fn caller(&self) -> UserId {
        self.caller
    }

    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    pub fn managed_organizations(&self) -> &BTreeSet<OrganizationId> {
        &self.managed
    }

    /// Whether the caller may see and edit records of `organization`.
    pub fn manages(&self, organization: OrganizationId) -> bool {
        self.is_superuser || self.managed.contains(&organization)
    }

    pub fn organization_filter(&self) -> OrganizationFilter {
        if self.is_superuser {
            OrganizationFilter::All
        } else {
            OrganizationFilter::Only(self.managed.clone())
        }
    }

    pub fn user_filter(&self) -> UserFilter {
        if self.is_superuser {
            UserFilter::all()
        } else {
            UserFilter {
                members_of: Some(self.managed.clone()),
                exclude_superusers: true,
                always_include: None,
            }
        }
    }

    /// The user scope widened with the caller's own account.
    pub fn user_filter_including_self(&self) -> UserFilter {
        UserFilter {
            always_include: Some(self.caller),
            ..self.user_filter()
        }
    }
}

/// Organization visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationFilter {
    All,
    Only(BTreeSet<OrganizationId>),
}

impl OrganizationFilter {
    pub fn matches(&self, organization: &Organization) -> bool {
        match self {
            OrganizationFilter::All => true,
            OrganizationFilter::Only(ids) => ids.contains(&organization.id),
        }
    }

    /// Matching organizations, newest first.
    pub fn apply(&self, organizations: impl IntoIterator<Item = Organization>) -> Vec<Organization> {
        let mut out: Vec<Organization> = organizations
            .into_iter()
            .filter(|o| self.matches(o))
            .collect();
        entity::newest_first(&mut out);
        out
    }
}

/// User visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    /// Only members of these organizations (`None`: no membership restriction).
    pub members_of: Option<BTreeSet<OrganizationId>>,
    pub exclude_superusers: bool,
    /// Visible regardless of the rules above.
    pub always_include: Option<UserId>,
}

impl UserFilter {
    pub fn all() -> Self {
        Self {
            members_of: None,
            exclude_superusers: false,
            always_include: None,
        }
    }

    /// `organizations` are the organizations `user` belongs to.
    pub fn matches(&self, user: &User, organizations: &BTreeSet<OrganizationId>) -> bool {
        if self.always_include == Some(user.id) {
            return true;
        }
        if self.exclude_superusers && user.is_superuser {
            return false;
        }
        match &self.members_of {
            None => true,
            Some(allowed) => !allowed.is_disjoint(organizations),
        }
    }

    /// Matching users (each once), newest first.
    pub fn apply(
        &self,
        users: impl IntoIterator<Item = User>,
        memberships: &[OrganizationUser],
    ) -> Vec<User> {
        let mut by_user: HashMap<UserId, BTreeSet<OrganizationId>> = HashMap::new();
        for m in memberships {
            by_user.entry(m.user_id).or_default().insert(m.organization_id);
        }

        let empty = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut out: Vec<User> = users
            .into_iter()
            .filter(|u| seen.insert(u.id))
            .filter(|u| self.matches(u, by_user.get(&u.id).unwrap_or(&empty)))
            .collect();
        entity::newest_first(&mut out);
        out
    }
}
