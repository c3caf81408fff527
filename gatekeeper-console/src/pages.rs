//! Page controllers
//!
//! Headless counterparts of the console's entity pages. Every mutation passes the
//! authorization gate first; a denial is returned as `Err` and no request is sent.
//! Once past the gate, server failures surface as a `Rejected` outcome, never as `Err`.

use gatekeeper_core::{
    Action, CancelToken, EntityId, GatekeeperResult, Group, Module, Permission,
    Resource, Role, User,
};

use crate::assignment::{GroupRoleFlow, GroupUserFlow, RolePermissionFlow};
use crate::auth::AuthStore;
use crate::gate::Gate;
use crate::state::OperationOutcome;
use crate::store::{GroupStore, ModuleStore, ResourceStore, RoleStore, UserStore};

pub type UsersPage = ResourcePage<User>;
pub type GroupsPage = ResourcePage<Group>;
pub type RolesPage = ResourcePage<Role>;
pub type ModulesPage = ResourcePage<Module>;
pub type PermissionsPage = ResourcePage<Permission>;

pub struct ResourcePage<R: Resource> {
    store: ResourceStore<R>,
    auth: AuthStore,
}

impl<R: Resource> ResourcePage<R> {
    pub fn new(store: ResourceStore<R>, auth: AuthStore) -> Self {
        Self { store, auth }
    }

    pub fn store(&self) -> &ResourceStore<R> {
        &self.store
    }

    pub async fn mount(&self, token: &CancelToken) -> OperationOutcome<Vec<R>> {
        self.store.fetch_all(token).await
    }

    /// Whether the action button for `action` should be offered
    pub async fn can(&self, action: Action) -> bool {
        self.gate().await.allows_on::<R>(action)
    }

    pub async fn create(
        &self,
        draft: &R::Draft,
        token: &CancelToken,
    ) -> GatekeeperResult<OperationOutcome<R>> {
        self.gate().await.check_on::<R>(Action::Create)?;
        Ok(self.store.create(draft, token).await)
    }

    /// Gate, then let the resource veto the change against its loaded copy
    pub async fn update(&self, entity: &R, token: &CancelToken) -> GatekeeperResult<OperationOutcome<R>> {
        self.gate().await.check_on::<R>(Action::Update)?;
        let cached = self.store.find(entity.id()).await;
        entity.check_update(cached.as_ref())?;
        Ok(self.store.update(entity, token).await)
    }

    pub async fn delete(
        &self,
        id: EntityId,
        token: &CancelToken,
    ) -> GatekeeperResult<OperationOutcome<EntityId>> {
        self.gate().await.check_on::<R>(Action::Delete)?;
        Ok(self.store.delete(id, token).await)
    }

    async fn gate(&self) -> Gate {
        self.auth.gate().await
    }
}

impl ResourcePage<Group> {
    pub async fn manage_users(&self, group_id: EntityId, users: UserStore) -> GatekeeperResult<GroupUserFlow> {
        self.gate().await.check_assign::<Group, User>()?;
        Ok(GroupUserFlow::new(group_id, self.store.clone(), users))
    }
}

impl ResourcePage<Role> {
    pub async fn assign_to_groups(
        &self,
        role_id: EntityId,
        groups: GroupStore,
    ) -> GatekeeperResult<GroupRoleFlow> {
        self.gate().await.check_assign::<Role, Group>()?;
        Ok(GroupRoleFlow::new(role_id, groups))
    }
}

impl ResourcePage<Permission> {
    pub async fn assign_to_roles(
        &self,
        roles: RoleStore,
        modules: ModuleStore,
    ) -> GatekeeperResult<RolePermissionFlow> {
        self.gate().await.check_assign::<Permission, Permission>()?;
        Ok(RolePermissionFlow::new(roles, self.store.clone(), modules))
    }
}
