//! Gatekeeper Console - application layer of the IAM console
//!
//! Everything a console view needs, without the view:
//!
//! - Per-entity resource stores with request lifecycle state
//! - The principal's session and permission list
//! - A client-side authorization gate (advisory, never a security boundary)
//! - Relationship-assignment flows and permission simulation
//! - Page controllers that gate mutations before they reach the network
//!
//! ## Architecture
//!
//! - **Transport** (gatekeeper-client): HTTP, session storage, typed routes
//! - **Application** (this crate): cached state and user-facing operations
//! - **Presentation** (gatekeeper-cli): command-line front end

pub mod assignment;
pub mod auth;
pub mod dashboard;
pub mod gate;
pub mod groups;
pub mod pages;
pub mod reconcile;
pub mod roles;
pub mod simulation;
pub mod state;
pub mod store;

pub use assignment::{
    available, AssignedEntry, GroupRoleFlow, GroupUserFlow, RolePermissionFlow, SuccessBanner,
    BANNER_TTL,
};
pub use auth::{AuthState, AuthStore};
pub use dashboard::{module_name, DashboardPage, ModuleActions, PermissionSummary};
pub use gate::{has_permission, Gate};
pub use pages::{
    GroupsPage, ModulesPage, PermissionsPage, ResourcePage, RolesPage, UsersPage,
};
pub use simulation::{SimulationState, Simulator};
pub use state::{Lifecycle, OperationOutcome, OperationPhase, StoreState};
pub use store::{GroupStore, ModuleStore, PermissionStore, ResourceStore, RoleStore, UserStore};
