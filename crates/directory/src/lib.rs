//! `orgusers-directory`: users, organizations, memberships, groups, and the
//! rules deciding who may see or change them.
//!
//! Everything here is pure: storage lives in `orgusers-infra`, transport in
//! `orgusers-api`.

pub mod catalog;
pub mod email;
pub mod group;
pub mod membership;
pub mod organization;
pub mod scope;
pub mod user;
pub mod validate;

pub use catalog::{PermissionCatalog, PermissionEntry};
pub use email::{EmailAddress, EmailChanges};
pub use group::{Group, GroupChanges};
pub use membership::{
    plan_memberships, plan_owner, MembershipInput, MembershipPlan, OrganizationOwner,
    OrganizationUser, OwnerChange,
};
pub use organization::{Organization, OrganizationChanges};
pub use scope::{CallerScope, OrganizationFilter, UserFilter};
pub use user::{User, UserChanges};
pub use validate::WriteMode;
