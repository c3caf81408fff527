//! Core trait definitions

use crate::error::GatekeeperResult;
use crate::types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity type the backend exposes as a REST collection
///
/// `PATH` is the collection route (`/api/users`), `COLLECTION` the key the backend
/// may wrap list and entity payloads in, and `MODULE` the module name the
/// authorization gate checks for this entity.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Draft: Serialize + Send + Sync;

    const PATH: &'static str;
    const COLLECTION: &'static str;
    const SINGULAR: &'static str;
    const MODULE: &'static str;

    fn id(&self) -> EntityId;

    fn item_path(id: EntityId) -> String {
        format!("{}/{}", Self::PATH, id)
    }

    /// Reject an update before it is sent. `cached` is the loaded copy, if any.
    fn check_update(&self, _cached: Option<&Self>) -> GatekeeperResult<()> {
        Ok(())
    }
}

impl Resource for User {
    type Draft = UserDraft;
    const PATH: &'static str = "/api/users";
    const COLLECTION: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const MODULE: &'static str = "Users";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Resource for Group {
    type Draft = GroupDraft;
    const PATH: &'static str = "/api/groups";
    const COLLECTION: &'static str = "groups";
    const SINGULAR: &'static str = "group";
    const MODULE: &'static str = "Groups";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Resource for Role {
    type Draft = RoleDraft;
    const PATH: &'static str = "/api/roles";
    const COLLECTION: &'static str = "roles";
    const SINGULAR: &'static str = "role";
    const MODULE: &'static str = "Roles";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Resource for Module {
    type Draft = ModuleDraft;
    const PATH: &'static str = "/api/modules";
    const COLLECTION: &'static str = "modules";
    const SINGULAR: &'static str = "module";
    const MODULE: &'static str = "Modules";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Resource for Permission {
    type Draft = PermissionDraft;
    const PATH: &'static str = "/api/permissions";
    const COLLECTION: &'static str = "permissions";
    const SINGULAR: &'static str = "permission";
    const MODULE: &'static str = "Permissions";

    fn id(&self) -> EntityId {
        self.id
    }

    /// The `(module_id, action)` pair is fixed once created
    fn check_update(&self, cached: Option<&Self>) -> GatekeeperResult<()> {
        let Some(cached) = cached else {
            return Err(crate::validation_error!(
                format!("Permission {} is not loaded", self.id),
                "id",
                "permission"
            ));
        };
        if self.module_id != cached.module_id {
            return Err(crate::validation_error!(
                "A permission's module cannot be changed",
                "module_id",
                "permission"
            ));
        }
        if self.action != cached.action {
            return Err(crate::validation_error!(
                "A permission's action cannot be changed",
                "action",
                "permission"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatekeeperError;

    fn loaded(module_id: EntityId, action: Action) -> Permission {
        Permission {
            module_id,
            action,
            ..Permission::reference(9)
        }
    }

    fn rejected_field(result: GatekeeperResult<()>) -> Option<String> {
        match result {
            Err(GatekeeperError::Validation { field, .. }) => field,
            _ => None,
        }
    }

    #[test]
    fn permission_pair_cannot_move() {
        let cached = loaded(2, Action::Read);

        assert!(loaded(2, Action::Read).check_update(Some(&cached)).is_ok());
        assert_eq!(
            rejected_field(loaded(3, Action::Read).check_update(Some(&cached))).as_deref(),
            Some("module_id")
        );
        assert_eq!(
            rejected_field(loaded(2, Action::Delete).check_update(Some(&cached))).as_deref(),
            Some("action")
        );
        assert_eq!(
            rejected_field(loaded(2, Action::Read).check_update(None)).as_deref(),
            Some("id")
        );
    }

    #[test]
    fn other_resources_update_freely() {
        let group = Group::reference(4);
        assert!(group.check_update(None).is_ok());
    }
}
