//! In-memory directory store for tests and development.
//!
//! All state sits behind one `RwLock`; a composite write checks every
//! constraint before it mutates anything, so a rejected write leaves the
//! state untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use orgusers_core::{EmailAddressId, GroupId, OrganizationId, OrganizationUserId, PermissionId, UserId};
use orgusers_directory::{
    EmailAddress, Group, MembershipPlan, Organization, OrganizationFilter, OrganizationOwner,
    OrganizationUser, OwnerChange, User, UserFilter,
};

use super::{DirectoryStore, StoreError, StoreResult, UserUpdate, UserWrite};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    organizations: HashMap<OrganizationId, Organization>,
    memberships: HashMap<OrganizationUserId, OrganizationUser>,
    owners: HashMap<OrganizationId, OrganizationUserId>,
    groups: BTreeMap<GroupId, Group>,
    last_group_id: i64,
    emails: HashMap<EmailAddressId, EmailAddress>,
}

impl State {
    fn check_user_unique(&self, user: &User) -> StoreResult<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(StoreError::duplicate("user", "username"));
            }
            if !user.email.is_empty() && other.email.eq_ignore_ascii_case(&user.email) {
                return Err(StoreError::duplicate("user", "email"));
            }
        }
        Ok(())
    }

    fn check_email_free(&self, user: UserId, email: &str) -> StoreResult<()> {
        let taken = self
            .users
            .values()
            .any(|u| u.id != user && !email.is_empty() && u.email.eq_ignore_ascii_case(email));
        if taken {
            Err(StoreError::duplicate("user", "email"))
        } else {
            Ok(())
        }
    }

    fn check_plan(&self, user: UserId, plan: &MembershipPlan) -> StoreResult<()> {
        let owned = |id: &OrganizationUserId| {
            self.memberships
                .get(id)
                .is_some_and(|m| m.user_id == user)
        };
        if !plan.update.iter().all(|(id, _)| owned(id)) || !plan.delete.iter().all(owned) {
            return Err(StoreError::NotFound);
        }

        let remaining: BTreeSet<OrganizationId> = self
            .memberships
            .values()
            .filter(|m| m.user_id == user && !plan.delete.contains(&m.id))
            .map(|m| m.organization_id)
            .collect();
        let mut added = BTreeSet::new();
        for m in &plan.create {
            if !self.organizations.contains_key(&m.organization_id) {
                return Err(StoreError::NotFound);
            }
            if remaining.contains(&m.organization_id) || !added.insert(m.organization_id) {
                return Err(StoreError::duplicate("organization user", "organization"));
            }
        }
        Ok(())
    }

    fn apply_plan(&mut self, plan: MembershipPlan) {
        let now = Utc::now();
        for id in &plan.delete {
            self.remove_membership(*id);
        }
        for (id, is_admin) in plan.update {
            if let Some(m) = self.memberships.get_mut(&id) {
                m.is_admin = is_admin;
                m.modified = now;
            }
        }
        for m in plan.create {
            self.memberships.insert(m.id, m);
        }
    }

    fn remove_membership(&mut self, id: OrganizationUserId) {
        self.memberships.remove(&id);
        self.owners.retain(|_, owner| *owner != id);
    }

    fn upsert_primary(&mut self, mut address: EmailAddress) -> EmailAddress {
        address.email = address.email.trim().to_lowercase();
        if address.primary {
            for other in self.emails.values_mut() {
                if other.user_id == address.user_id && other.id != address.id {
                    other.primary = false;
                }
            }
            if let Some(user) = self.users.get_mut(&address.user_id) {
                user.email = address.email.clone();
            }
        }
        self.emails.insert(address.id, address.clone());
        address
    }

    fn sorted_memberships(&self, keep: impl Fn(&OrganizationUser) -> bool) -> Vec<OrganizationUser> {
        let mut out: Vec<_> = self.memberships.values().filter(|m| keep(m)).cloned().collect();
        out.sort_by_key(|m| (m.created, m.id));
        out
    }
}

/// In-memory `DirectoryStore`.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    state: RwLock<State>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("directory state lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("directory state lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let state = self.read()?;
        let memberships: Vec<_> = state.memberships.values().cloned().collect();
        Ok(filter.apply(state.users.values().cloned(), &memberships))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, write: UserWrite) -> StoreResult<User> {
        let mut state = self.write()?;
        let UserWrite { user, memberships, primary_email } = write;

        if state.users.contains_key(&user.id) {
            return Err(StoreError::duplicate("user", "id"));
        }
        state.check_user_unique(&user)?;
        state.check_plan(user.id, &memberships)?;

        let id = user.id;
        state.users.insert(id, user);
        state.apply_plan(memberships);
        if let Some(address) = primary_email {
            state.upsert_primary(address);
        }
        state.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, update: UserUpdate) -> StoreResult<User> {
        let mut state = self.write()?;
        let UserUpdate { id, changes, memberships, primary_email } = update;

        let mut user = state.users.get(&id).cloned().ok_or(StoreError::NotFound)?;
        changes.apply_to(&mut user);
        state.check_user_unique(&user)?;
        state.check_plan(id, &memberships)?;
        if let Some(address) = &primary_email {
            if address.user_id != id {
                return Err(StoreError::NotFound);
            }
        }

        state.users.insert(id, user);
        state.apply_plan(memberships);
        if let Some(address) = primary_email {
            state.upsert_primary(address);
        }
        state.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        let memberships: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.user_id == id)
            .map(|m| m.id)
            .collect();
        for membership in memberships {
            state.remove_membership(membership);
        }
        state.emails.retain(|_, a| a.user_id != id);
        Ok(())
    }

    async fn set_password(&self, id: UserId, password_hash: String) -> StoreResult<()> {
        let mut state = self.write()?;
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn memberships_of_user(&self, user: UserId) -> StoreResult<Vec<OrganizationUser>> {
        Ok(self.read()?.sorted_memberships(|m| m.user_id == user))
    }

    async fn memberships_in(&self, organization: OrganizationId) -> StoreResult<Vec<OrganizationUser>> {
        Ok(self
            .read()?
            .sorted_memberships(|m| m.organization_id == organization))
    }

    async fn list_organizations(&self, filter: &OrganizationFilter) -> StoreResult<Vec<Organization>> {
        Ok(filter.apply(self.read()?.organizations.values().cloned()))
    }

    async fn get_organization(&self, id: OrganizationId) -> StoreResult<Option<Organization>> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }

    async fn owner_of(&self, organization: OrganizationId) -> StoreResult<Option<OrganizationOwner>> {
        Ok(self
            .read()?
            .owners
            .get(&organization)
            .map(|membership| OrganizationOwner {
                organization_id: organization,
                organization_user_id: *membership,
            }))
    }

    async fn insert_organization(&self, organization: Organization) -> StoreResult<Organization> {
        let mut state = self.write()?;
        if state.organizations.values().any(|o| o.slug == organization.slug) {
            return Err(StoreError::duplicate("organization", "slug"));
        }
        state.organizations.insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn update_organization(
        &self,
        organization: Organization,
        owner: OwnerChange,
    ) -> StoreResult<Organization> {
        let mut state = self.write()?;
        let id = organization.id;

        if !state.organizations.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if state
            .organizations
            .values()
            .any(|o| o.id != id && o.slug == organization.slug)
        {
            return Err(StoreError::duplicate("organization", "slug"));
        }
        if let OwnerChange::Assign(membership) = owner {
            let belongs = state
                .memberships
                .get(&membership)
                .is_some_and(|m| m.organization_id == id);
            if !belongs {
                return Err(StoreError::NotFound);
            }
        }

        state.organizations.insert(id, organization.clone());
        match owner {
            OwnerChange::Unchanged => {}
            OwnerChange::Clear => {
                state.owners.remove(&id);
            }
            OwnerChange::Assign(membership) => {
                state.owners.insert(id, membership);
            }
        }
        Ok(organization)
    }

    async fn delete_organization(&self, id: OrganizationId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.organizations.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        state.memberships.retain(|_, m| m.organization_id != id);
        state.owners.remove(&id);
        Ok(())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.read()?.groups.values().cloned().collect())
    }

    async fn get_group(&self, id: GroupId) -> StoreResult<Option<Group>> {
        Ok(self.read()?.groups.get(&id).cloned())
    }

    async fn insert_group(
        &self,
        name: String,
        permissions: BTreeSet<PermissionId>,
    ) -> StoreResult<Group> {
        let mut state = self.write()?;
        if state.groups.values().any(|g| g.name == name) {
            return Err(StoreError::duplicate("group", "name"));
        }
        state.last_group_id += 1;
        let group = Group {
            id: GroupId::new(state.last_group_id),
            name,
            permissions,
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update_group(&self, group: Group) -> StoreResult<Group> {
        let mut state = self.write()?;
        if !state.groups.contains_key(&group.id) {
            return Err(StoreError::NotFound);
        }
        if state
            .groups
            .values()
            .any(|g| g.id != group.id && g.name == group.name)
        {
            return Err(StoreError::duplicate("group", "name"));
        }
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: GroupId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.groups.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        for user in state.users.values_mut() {
            user.groups.remove(&id);
        }
        Ok(())
    }

    async fn email_addresses(&self, user: UserId) -> StoreResult<Vec<EmailAddress>> {
        let state = self.read()?;
        let mut out: Vec<_> = state
            .emails
            .values()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.id);
        Ok(out)
    }

    async fn save_email_address(&self, address: EmailAddress) -> StoreResult<EmailAddress> {
        let mut state = self.write()?;
        if !state.users.contains_key(&address.user_id) {
            return Err(StoreError::NotFound);
        }
        if address.primary {
            state.check_email_free(address.user_id, address.email.trim())?;
        }
        Ok(state.upsert_primary(address))
    }

    async fn delete_email_addresses(&self, user: UserId) -> StoreResult<()> {
        self.write()?.emails.retain(|_, a| a.user_id != user);
        Ok(())
    }
}
