//! Role to permission edges

use gatekeeper_core::{CancelToken, EntityId, Permission};

use crate::reconcile;
use crate::state::OperationOutcome;
use crate::store::{drive, RoleStore};

impl RoleStore {
    pub async fn add_permission(
        &self,
        role_id: EntityId,
        permission_id: EntityId,
        token: &CancelToken,
    ) -> OperationOutcome<()> {
        let outcome = drive(
            &self.state,
            "add_permission_to_role",
            token,
            self.api.add_permission_to_role(role_id, permission_id),
            |_, _| {},
        )
        .await;

        if outcome.is_fulfilled() {
            self.patch(role_id, |role| {
                reconcile::add_if_absent(&mut role.permissions, Permission::reference(permission_id));
            })
            .await;
        }
        outcome
    }

    pub async fn remove_permission(
        &self,
        role_id: EntityId,
        permission_id: EntityId,
        token: &CancelToken,
    ) -> OperationOutcome<()> {
        let outcome = drive(
            &self.state,
            "remove_permission_from_role",
            token,
            self.api.remove_permission_from_role(role_id, permission_id),
            |_, _| {},
        )
        .await;

        if outcome.is_fulfilled() {
            self.patch(role_id, |role| {
                reconcile::remove_if_present(&mut role.permissions, permission_id);
            })
            .await;
        }
        outcome
    }
}
