//! Core data type definitions
//!
//! All entities are owned by the IAM backend; the console only holds cached copies.
//! Relation arrays (`Group::users`, `Role::permissions`, ...) may contain reference
//! stubs that carry nothing but an id, which is why every non-id field has a default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned, immutable entity identifier
pub type EntityId = u64;

/// The verb being authorized against a module
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(format!("Unknown action: {} (expected create, read, update or delete)", s)),
        }
    }
}

/// Account managed through the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Session credential, only present on the logged-in principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl User {
    /// Id-only reference used when patching relation arrays
    pub fn reference(id: EntityId) -> Self {
        Self {
            id,
            username: String::new(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            created_at: None,
            updated_at: None,
            token: None,
        }
    }

    /// Picker label: username, else full name, else email
    pub fn display_name(&self) -> String {
        if !self.username.is_empty() {
            return self.username.clone();
        }
        let full_name = format!("{} {}", self.first_name, self.last_name);
        let full_name = full_name.trim();
        if !full_name.is_empty() {
            return full_name.to_string();
        }
        self.email.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// A named resource category subject to access control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub name: String,
}

/// The (module, action) pair as a first-class entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: EntityId,
    #[serde(default = "default_action")]
    pub action: Action,
    #[serde(default)]
    pub module_id: EntityId,
    /// Expanded module, when the backend joins it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Module>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_action() -> Action {
    Action::Read
}

impl Permission {
    pub fn reference(id: EntityId) -> Self {
        Self {
            id,
            action: default_action(),
            module_id: 0,
            module: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Module name if the backend expanded it
    pub fn module_name(&self) -> Option<&str> {
        self.module.as_ref().map(|m| m.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDraft {
    pub action: Action,
    pub module_id: EntityId,
}

/// A named bundle of permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Read-only projection of the groups holding this role
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn reference(id: EntityId) -> Self {
        Self {
            id,
            name: String::new(),
            permissions: Vec::new(),
            groups: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
}

/// A named bundle of users and roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn reference(id: EntityId) -> Self {
        Self {
            id,
            name: String::new(),
            users: Vec::new(),
            roles: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
}

/// One entry of the principal's flattened permission list
///
/// Both fields are plain strings: the gate compares them byte-for-byte.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalPermission {
    pub module: String,
    pub action: String,
}

impl PrincipalPermission {
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
        }
    }
}

/// Persisted login state: the principal plus its bearer credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Session {
    /// Bearer credential, preferring the top-level token over the one embedded in the user
    pub fn bearer_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or(self.user.token.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub module_id: EntityId,
    pub action: Action,
}

/// Backend verdict for a simulated action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationVerdict {
    pub allowed: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_text() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        assert!("Delete".parse::<Action>().is_err());
    }

    #[test]
    fn group_reference_stubs_deserialize() {
        let group: Group = serde_json::from_str(r#"{"id":7,"name":"Ops","users":[{"id":3}]}"#)
            .expect("group parses");
        assert_eq!(group.users, vec![User::reference(3)]);
        assert!(group.roles.is_empty());
    }

    #[test]
    fn display_name_falls_back_to_name_then_email() {
        let mut user = User::reference(1);
        user.email = "ada@example.com".to_string();
        assert_eq!(user.display_name(), "ada@example.com");

        user.first_name = "Ada".to_string();
        user.last_name = "Lovelace".to_string();
        assert_eq!(user.display_name(), "Ada Lovelace");

        user.username = "ada".to_string();
        assert_eq!(user.display_name(), "ada");
    }

    #[test]
    fn session_token_prefers_top_level() {
        let mut user = User::reference(1);
        user.token = Some("embedded".to_string());
        let session = Session {
            user: user.clone(),
            token: Some("outer".to_string()),
        };
        assert_eq!(session.bearer_token(), Some("outer"));

        let session = Session { user, token: None };
        assert_eq!(session.bearer_token(), Some("embedded"));
    }
}
