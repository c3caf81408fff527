//! Client-side authorization gate
//!
//! Advisory only: it decides which actions the console offers and short-circuits
//! mutations before any request is sent. The backend enforces the real policy.

use gatekeeper_core::{
    Action, ErrorContext, GatekeeperError, GatekeeperResult, PrincipalPermission, Resource,
};

/// Exact, case-sensitive match on both fields. No wildcards, no hierarchy.
pub fn has_permission(permissions: &[PrincipalPermission], module: &str, action: &str) -> bool {
    permissions
        .iter()
        .any(|p| p.module == module && p.action == action)
}

#[derive(Debug, Clone, Default)]
pub struct Gate {
    permissions: Vec<PrincipalPermission>,
}

impl Gate {
    pub fn new(permissions: Vec<PrincipalPermission>) -> Self {
        Self { permissions }
    }

    pub fn permissions(&self) -> &[PrincipalPermission] {
        &self.permissions
    }

    pub fn allows(&self, module: &str, action: &str) -> bool {
        has_permission(&self.permissions, module, action)
    }

    pub fn allows_on<R: Resource>(&self, action: Action) -> bool {
        self.allows(R::MODULE, action.as_str())
    }

    /// `Ok` when allowed, otherwise a `PermissionDenied` carrying the user-facing notice
    pub fn check(&self, module: &str, action: Action) -> GatekeeperResult<()> {
        self.deny_unless(module, action, module, action.as_str())
    }

    pub fn check_on<R: Resource>(&self, action: Action) -> GatekeeperResult<()> {
        self.check(R::MODULE, action)
    }

    /// Assigning `Target` entities from an `Owner` page needs `update` on the owner's
    /// module; the notice names what was being assigned ("assign users").
    pub fn check_assign<Owner: Resource, Target: Resource>(&self) -> GatekeeperResult<()> {
        self.deny_unless(Owner::MODULE, Action::Update, Target::MODULE, "assign")
    }

    fn deny_unless(
        &self,
        module: &str,
        action: Action,
        subject: &str,
        label: &str,
    ) -> GatekeeperResult<()> {
        if self.allows(module, action.as_str()) {
            return Ok(());
        }

        let error = GatekeeperError::PermissionDenied {
            module: subject.to_string(),
            action: label.to_string(),
            context: ErrorContext::new("gate")
                .with_metadata("required_module", module)
                .with_metadata("required_action", action.as_str()),
        };
        error.log();
        Err(error)
    }
}
