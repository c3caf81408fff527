//! Relationship-assignment flows
//!
//! Each flow loads the stores it reads from, offers the complement of what is already
//! assigned, and issues one association call per confirmed selection. Selection and
//! the success banner are transient and reset on close.

use gatekeeper_core::{CancelToken, EntityId, Permission, Resource, User};
use std::time::{Duration, Instant};

use crate::dashboard::module_name;
use crate::state::OperationOutcome;
use crate::store::{GroupStore, ModuleStore, PermissionStore, RoleStore, UserStore};

/// How long a success banner stays visible
pub const BANNER_TTL: Duration = Duration::from_secs(2);

pub const UNKNOWN_USER: &str = "Unknown User";
pub const UNKNOWN_PERMISSION: &str = "Unknown Permission";

/// `all` minus every entity whose id appears in `assigned`, in `all`'s order
pub fn available<R: Resource>(all: &[R], assigned: &[R]) -> Vec<R> {
    all.iter()
        .filter(|candidate| !assigned.iter().any(|a| a.id() == candidate.id()))
        .cloned()
        .collect()
}

/// Timed confirmation message
#[derive(Debug, Clone, Default)]
pub struct SuccessBanner {
    shown: Option<(String, Instant)>,
}

impl SuccessBanner {
    pub fn show(&mut self, message: impl Into<String>) {
        self.show_at(message, Instant::now());
    }

    pub fn show_at(&mut self, message: impl Into<String>, at: Instant) {
        self.shown = Some((message.into(), at));
    }

    pub fn message(&self) -> Option<&str> {
        self.message_at(Instant::now())
    }

    pub fn message_at(&self, now: Instant) -> Option<&str> {
        match &self.shown {
            Some((message, at)) if now.saturating_duration_since(*at) < BANNER_TTL => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.shown = None;
    }
}

/// Row in a "current members" list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedEntry {
    pub id: EntityId,
    pub label: String,
}

/// Manage the users of one group
pub struct GroupUserFlow {
    group_id: EntityId,
    groups: GroupStore,
    users: UserStore,
    selected: Option<EntityId>,
    banner: SuccessBanner,
}

impl GroupUserFlow {
    pub fn new(group_id: EntityId, groups: GroupStore, users: UserStore) -> Self {
        Self {
            group_id,
            groups,
            users,
            selected: None,
            banner: SuccessBanner::default(),
        }
    }

    pub async fn open(&self, token: &CancelToken) -> OperationOutcome<()> {
        self.users.fetch_all(token).await.map(|_| ())
    }

    async fn assigned(&self) -> Vec<User> {
        self.groups
            .find(self.group_id)
            .await
            .map(|group| group.users)
            .unwrap_or_default()
    }

    /// Picker contents: users not yet in the group
    pub async fn available_users(&self) -> Vec<User> {
        available(&self.users.items().await, &self.assigned().await)
    }

    pub async fn members(&self) -> Vec<AssignedEntry> {
        let users = self.users.items().await;
        self.assigned()
            .await
            .into_iter()
            .map(|member| AssignedEntry {
                id: member.id,
                label: users
                    .iter()
                    .find(|u| u.id == member.id)
                    .map(User::display_name)
                    .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            })
            .collect()
    }

    pub fn select(&mut self, user_id: EntityId) {
        self.selected = Some(user_id);
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    /// Add the selected user; `None` when nothing is selected
    pub async fn confirm(&mut self, token: &CancelToken) -> Option<OperationOutcome<()>> {
        let user_id = self.selected.take()?;
        let outcome = self.groups.add_users(self.group_id, &[user_id], token).await;
        if outcome.is_fulfilled() {
            self.banner.show("User added to group successfully");
        }
        Some(outcome)
    }

    pub async fn remove(&mut self, user_id: EntityId, token: &CancelToken) -> OperationOutcome<()> {
        self.groups.remove_user(self.group_id, user_id, token).await
    }

    pub fn banner(&self) -> &SuccessBanner {
        &self.banner
    }

    pub fn close(&mut self) {
        self.selected = None;
        self.banner.clear();
    }
}

/// Assign one role to a group of the operator's choice
pub struct GroupRoleFlow {
    role_id: EntityId,
    groups: GroupStore,
    selected: Option<EntityId>,
    banner: SuccessBanner,
}

impl GroupRoleFlow {
    pub fn new(role_id: EntityId, groups: GroupStore) -> Self {
        Self {
            role_id,
            groups,
            selected: None,
            banner: SuccessBanner::default(),
        }
    }

    pub async fn open(&self, token: &CancelToken) -> OperationOutcome<()> {
        self.groups.fetch_all(token).await.map(|_| ())
    }

    /// Groups that do not hold the role yet
    pub async fn available_groups(&self) -> Vec<gatekeeper_core::Group> {
        self.groups
            .items()
            .await
            .into_iter()
            .filter(|group| !group.roles.iter().any(|r| r.id == self.role_id))
            .collect()
    }

    pub fn select(&mut self, group_id: EntityId) {
        self.selected = Some(group_id);
    }

    pub async fn confirm(&mut self, token: &CancelToken) -> Option<OperationOutcome<()>> {
        let group_id = self.selected.take()?;
        let outcome = self.groups.add_role(group_id, self.role_id, token).await;
        if outcome.is_fulfilled() {
            self.banner.show("Role assigned to group successfully");
        }
        Some(outcome)
    }

    pub async fn remove(&mut self, group_id: EntityId, token: &CancelToken) -> OperationOutcome<()> {
        self.groups.remove_role(group_id, self.role_id, token).await
    }

    pub fn banner(&self) -> &SuccessBanner {
        &self.banner
    }

    pub fn close(&mut self) {
        self.selected = None;
        self.banner.clear();
    }
}

/// Pick a role, then grant or revoke its permissions
pub struct RolePermissionFlow {
    roles: RoleStore,
    permissions: PermissionStore,
    modules: ModuleStore,
    selected_role: Option<EntityId>,
    selected_permission: Option<EntityId>,
    banner: SuccessBanner,
}

impl RolePermissionFlow {
    pub fn new(roles: RoleStore, permissions: PermissionStore, modules: ModuleStore) -> Self {
        Self {
            roles,
            permissions,
            modules,
            selected_role: None,
            selected_permission: None,
            banner: SuccessBanner::default(),
        }
    }

    /// Load permissions, roles and modules; stops at the first call that does not fulfil
    pub async fn open(&self, token: &CancelToken) -> OperationOutcome<()> {
        let permissions = self.permissions.fetch_all(token).await;
        if !permissions.is_fulfilled() {
            return permissions.map(|_| ());
        }
        let roles = self.roles.fetch_all(token).await;
        if !roles.is_fulfilled() {
            return roles.map(|_| ());
        }
        self.modules.fetch_all(token).await.map(|_| ())
    }

    /// Changing the role drops the pending permission choice
    pub fn select_role(&mut self, role_id: EntityId) {
        self.selected_role = Some(role_id);
        self.selected_permission = None;
    }

    pub fn select_permission(&mut self, permission_id: EntityId) {
        self.selected_permission = Some(permission_id);
    }

    async fn assigned(&self) -> Vec<Permission> {
        match self.selected_role {
            Some(role_id) => self
                .roles
                .find(role_id)
                .await
                .map(|role| role.permissions)
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub async fn available_permissions(&self) -> Vec<Permission> {
        available(&self.permissions.items().await, &self.assigned().await)
    }

    /// `<module> - <action>` for each permission of the selected role
    pub async fn current_permissions(&self) -> Vec<AssignedEntry> {
        let permissions = self.permissions.items().await;
        let modules = self.modules.items().await;
        self.assigned()
            .await
            .into_iter()
            .map(|assigned| AssignedEntry {
                id: assigned.id,
                label: permissions
                    .iter()
                    .find(|p| p.id == assigned.id)
                    .map(|p| format!("{} - {}", module_name(&modules, p.module_id), p.action))
                    .unwrap_or_else(|| UNKNOWN_PERMISSION.to_string()),
            })
            .collect()
    }

    pub async fn confirm(&mut self, token: &CancelToken) -> Option<OperationOutcome<()>> {
        let role_id = self.selected_role?;
        let permission_id = self.selected_permission.take()?;
        let outcome = self.roles.add_permission(role_id, permission_id, token).await;
        if outcome.is_fulfilled() {
            self.banner.show("Permission assigned to role successfully");
        }
        Some(outcome)
    }

    pub async fn remove(
        &mut self,
        permission_id: EntityId,
        token: &CancelToken,
    ) -> Option<OperationOutcome<()>> {
        let role_id = self.selected_role?;
        Some(self.roles.remove_permission(role_id, permission_id, token).await)
    }

    pub fn banner(&self) -> &SuccessBanner {
        &self.banner
    }

    pub fn close(&mut self) {
        self.selected_role = None;
        self.selected_permission = None;
        self.banner.clear();
    }
}
