//! Principal overview: who is logged in and what they may do

use gatekeeper_core::{CancelToken, EntityId, Module, PrincipalPermission, User};
use serde::Serialize;

use crate::auth::AuthStore;
use crate::simulation::Simulator;
use crate::state::OperationOutcome;
use crate::store::ModuleStore;

pub const UNKNOWN_MODULE: &str = "Unknown";

/// Name of the module with `id`, or `"Unknown"`
pub fn module_name(modules: &[Module], id: EntityId) -> String {
    modules
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| UNKNOWN_MODULE.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleActions {
    pub module: String,
    pub actions: Vec<String>,
}

/// Permission list grouped by module, modules in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSummary {
    pub modules: Vec<ModuleActions>,
}

impl PermissionSummary {
    pub fn from_permissions(permissions: &[PrincipalPermission]) -> Self {
        let mut modules: Vec<ModuleActions> = Vec::new();
        for permission in permissions {
            match modules.iter_mut().find(|m| m.module == permission.module) {
                Some(entry) => {
                    if !entry.actions.contains(&permission.action) {
                        entry.actions.push(permission.action.clone());
                    }
                }
                None => modules.push(ModuleActions {
                    module: permission.module.clone(),
                    actions: vec![permission.action.clone()],
                }),
            }
        }
        Self { modules }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Landing page: principal, its permissions and the simulation form
pub struct DashboardPage {
    auth: AuthStore,
    modules: ModuleStore,
    simulator: Simulator,
}

impl DashboardPage {
    pub fn new(auth: AuthStore, modules: ModuleStore, simulator: Simulator) -> Self {
        Self {
            auth,
            modules,
            simulator,
        }
    }

    /// Load the principal's permissions and the module list for the simulation picker
    pub async fn mount(&self, token: &CancelToken) -> OperationOutcome<PermissionSummary> {
        let outcome = self.auth.load_permissions(token).await;
        if outcome.is_fulfilled() {
            // The picker degrades to "Unknown" names if modules cannot be listed
            self.modules.fetch_all(token).await;
        }
        outcome.map(|permissions| PermissionSummary::from_permissions(&permissions))
    }

    pub async fn principal(&self) -> Option<User> {
        self.auth.current_user().await
    }

    pub async fn summary(&self) -> PermissionSummary {
        PermissionSummary::from_permissions(&self.auth.effective_permissions().await)
    }

    pub async fn module_label(&self, id: EntityId) -> String {
        module_name(&self.modules.items().await, id)
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_module_in_first_seen_order() {
        let summary = PermissionSummary::from_permissions(&[
            PrincipalPermission::new("Users", "read"),
            PrincipalPermission::new("Roles", "read"),
            PrincipalPermission::new("Users", "update"),
            PrincipalPermission::new("Users", "read"),
        ]);
        assert_eq!(
            summary.modules,
            vec![
                ModuleActions {
                    module: "Users".to_string(),
                    actions: vec!["read".to_string(), "update".to_string()],
                },
                ModuleActions {
                    module: "Roles".to_string(),
                    actions: vec!["read".to_string()],
                },
            ]
        );
        assert!(PermissionSummary::from_permissions(&[]).is_empty());
    }

    #[test]
    fn unresolved_module_is_unknown() {
        let modules = vec![Module {
            id: 1,
            name: "Users".to_string(),
            created_at: None,
            updated_at: None,
        }];
        assert_eq!(module_name(&modules, 1), "Users");
        assert_eq!(module_name(&modules, 2), UNKNOWN_MODULE);
    }
}
