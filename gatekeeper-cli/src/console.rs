//! Console stores wired to the HTTP backend and the on-disk session

use anyhow::{anyhow, bail, Context, Result};
use gatekeeper_client::{
    ApiClientConfig, FileSessionStore, HttpTransport, IamApi, Navigator, SessionProvider,
    LOGIN_ROUTE,
};
use gatekeeper_console::{
    AuthStore, DashboardPage, GroupStore, GroupsPage, ModuleStore, ModulesPage, OperationOutcome,
    PermissionStore, PermissionsPage, RoleStore, RolesPage, Simulator, UserStore, UsersPage,
};
use gatekeeper_core::{CancelToken, GatekeeperConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Terminal counterpart of the login redirect
pub struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self) {
        warn!(route = LOGIN_ROUTE, "Session invalidated");
        eprintln!("Session expired or invalid. Run `gatekeeper login` to sign in again.");
    }
}

pub struct Console {
    pub api: IamApi,
    pub auth: AuthStore,
    pub users: UserStore,
    pub groups: GroupStore,
    pub roles: RoleStore,
    pub modules: ModuleStore,
    pub permissions: PermissionStore,
    /// Fired by Ctrl-C
    pub token: CancelToken,
}

impl Console {
    pub fn connect(config: &GatekeeperConfig) -> Result<Self> {
        let session_dir = &config.storage.session_dir;
        let session: Arc<dyn SessionProvider> = Arc::new(
            FileSessionStore::new(session_dir)
                .with_context(|| format!("Failed to open session directory {:?}", session_dir))?,
        );

        let transport = HttpTransport::new(
            ApiClientConfig::from(&config.api),
            Arc::clone(&session),
            Arc::new(CliNavigator),
        )?;
        let api = IamApi::new(Arc::new(transport));

        let token = CancelToken::new();
        let watcher = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, cancelling");
                watcher.cancel();
            }
        });

        Ok(Self {
            auth: AuthStore::new(api.clone(), session),
            users: UserStore::new(api.clone()),
            groups: GroupStore::new(api.clone()),
            roles: RoleStore::new(api.clone()),
            modules: ModuleStore::new(api.clone()),
            permissions: PermissionStore::new(api.clone()),
            api,
            token,
        })
    }

    pub fn users_page(&self) -> UsersPage {
        UsersPage::new(self.users.clone(), self.auth.clone())
    }

    pub fn groups_page(&self) -> GroupsPage {
        GroupsPage::new(self.groups.clone(), self.auth.clone())
    }

    pub fn roles_page(&self) -> RolesPage {
        RolesPage::new(self.roles.clone(), self.auth.clone())
    }

    pub fn modules_page(&self) -> ModulesPage {
        ModulesPage::new(self.modules.clone(), self.auth.clone())
    }

    pub fn permissions_page(&self) -> PermissionsPage {
        PermissionsPage::new(self.permissions.clone(), self.auth.clone())
    }

    pub fn dashboard(&self) -> DashboardPage {
        DashboardPage::new(
            self.auth.clone(),
            self.modules.clone(),
            Simulator::new(self.api.clone()),
        )
    }
}

/// Turn a store outcome into a command result
pub fn settle<T>(outcome: OperationOutcome<T>) -> Result<T> {
    match outcome {
        OperationOutcome::Fulfilled(value) => Ok(value),
        OperationOutcome::Rejected(message) => Err(anyhow!(message)),
        OperationOutcome::Cancelled => bail!("Operation cancelled"),
    }
}

/// Outcome of a lookup the command can do without; failures are logged and dropped
pub fn optional<T>(outcome: OperationOutcome<T>, what: &str) -> Option<T> {
    match outcome {
        OperationOutcome::Fulfilled(value) => Some(value),
        OperationOutcome::Rejected(message) => {
            warn!(lookup = what, error = %message, "Lookup failed, continuing without it");
            None
        }
        OperationOutcome::Cancelled => {
            warn!(lookup = what, "Lookup cancelled, continuing without it");
            None
        }
    }
}

/// Human or JSON rendering of command results
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn list<T: Serialize>(&self, items: &[T], line: impl Fn(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(items)?);
            return Ok(());
        }
        if items.is_empty() {
            println!("(none)");
        }
        for item in items {
            println!("{}", line(item));
        }
        Ok(())
    }

    pub fn one<T: Serialize>(&self, item: &T, summary: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(item)?);
        } else {
            println!("{}", summary(item));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_maps_every_outcome() {
        assert_eq!(settle(OperationOutcome::Fulfilled(7)).unwrap(), 7);

        let rejected = settle::<()>(OperationOutcome::Rejected("Group not found".to_string()));
        assert_eq!(rejected.unwrap_err().to_string(), "Group not found");

        let cancelled = settle::<()>(OperationOutcome::Cancelled);
        assert_eq!(cancelled.unwrap_err().to_string(), "Operation cancelled");
    }

    #[test]
    fn optional_lookups_never_fail_the_command() {
        assert_eq!(optional(OperationOutcome::Fulfilled(vec![1]), "modules"), Some(vec![1]));
        assert_eq!(
            optional::<Vec<u32>>(OperationOutcome::Rejected("Network Error".to_string()), "modules"),
            None
        );
        assert_eq!(optional::<Vec<u32>>(OperationOutcome::Cancelled, "modules"), None);
    }
}
