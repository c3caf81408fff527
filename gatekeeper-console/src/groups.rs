//! Group membership edges (group to user, group to role)

use gatekeeper_core::{CancelToken, EntityId, Role, User};

use crate::reconcile;
use crate::state::OperationOutcome;
use crate::store::{drive, GroupStore};

impl GroupStore {
    /// Add users to a group, then patch the cached group's `users` in place
    pub async fn add_users(
        &self,
        group_id: EntityId,
        user_ids: &[EntityId],
        token: &CancelToken,
    ) -> OperationOutcome<()> {
        let outcome = drive(
            &self.state,
            "add_users_to_group",
            token,
            self.api.add_users_to_group(group_id, user_ids),
            |_, _| {},
        )
        .await;

        if outcome.is_fulfilled() {
            self.patch(group_id, |group| {
                for id in user_ids {
                    reconcile::add_if_absent(&mut group.users, User::reference(*id));
                }
            })
            .await;
        }
        outcome
    }

    pub async fn remove_user(
        &self,
        group_id: EntityId,
        user_id: EntityId,
        token: &CancelToken,
    ) -> OperationOutcome<()> {
        let outcome = drive(
            &self.state,
            "remove_user_from_group",
            token,
            self.api.remove_user_from_group(group_id, user_id),
            |_, _| {},
        )
        .await;

        if outcome.is_fulfilled() {
            self.patch(group_id, |group| {
                reconcile::remove_if_present(&mut group.users, user_id);
            })
            .await;
        }
        outcome
    }

    pub async fn add_role(
        &self,
        group_id: EntityId,
        role_id: EntityId,
        token: &CancelToken,
    ) -> OperationOutcome<()> {
        let outcome = drive(
            &self.state,
            "add_role_to_group",
            token,
            self.api.add_role_to_group(group_id, role_id),
            |_, _| {},
        )
        .await;

        if outcome.is_fulfilled() {
            self.patch(group_id, |group| {
                reconcile::add_if_absent(&mut group.roles, Role::reference(role_id));
            })
            .await;
        }
        outcome
    }

    pub async fn remove_role(
        &self,
        group_id: EntityId,
        role_id: EntityId,
        token: &CancelToken,
    ) -> OperationOutcome<()> {
        let outcome = drive(
            &self.state,
            "remove_role_from_group",
            token,
            self.api.remove_role_from_group(group_id, role_id),
            |_, _| {},
        )
        .await;

        if outcome.is_fulfilled() {
            self.patch(group_id, |group| {
                reconcile::remove_if_present(&mut group.roles, role_id);
            })
            .await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_client::mock::{Reply, ScriptedTransport};
    use gatekeeper_client::IamApi;
    use serde_json::json;
    use std::sync::Arc;

    fn seeded() -> (Arc<ScriptedTransport>, GroupStore) {
        let transport = Arc::new(ScriptedTransport::with_replies([Reply::Json(json!({
            "groups": [{"id": 1, "name": "Ops", "users": [{"id": 2}], "roles": []}]
        }))]));
        let store = GroupStore::new(IamApi::new(transport.clone()));
        (transport, store)
    }

    #[tokio::test]
    async fn adding_members_is_idempotent() {
        let (transport, groups) = seeded();
        let token = CancelToken::never();
        groups.fetch_all(&token).await;

        transport.push(Reply::Json(json!({"message": "Users added"})));
        transport.push(Reply::Json(json!({"message": "Users added"})));
        assert!(groups.add_users(1, &[2, 4], &token).await.is_fulfilled());
        assert!(groups.add_users(1, &[4], &token).await.is_fulfilled());

        let group = groups.find(1).await.expect("group cached");
        let ids: Vec<_> = group.users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[tokio::test]
    async fn failed_removal_leaves_relation_alone() {
        let (transport, groups) = seeded();
        let token = CancelToken::never();
        groups.fetch_all(&token).await;

        transport.push(Reply::Status(404, Some("User not in group".to_string())));
        let outcome = groups.remove_user(1, 2, &token).await;
        assert_eq!(outcome, OperationOutcome::Rejected("User not in group".to_string()));
        assert_eq!(groups.find(1).await.expect("group").users.len(), 1);

        transport.push(Reply::Json(json!({})));
        assert!(groups.remove_user(1, 2, &token).await.is_fulfilled());
        assert!(groups.find(1).await.expect("group").users.is_empty());
    }

    #[tokio::test]
    async fn role_edges_patch_roles() {
        let (transport, groups) = seeded();
        let token = CancelToken::never();
        groups.fetch_all(&token).await;

        transport.push(Reply::Json(json!({})));
        transport.push(Reply::Json(json!({})));
        groups.add_role(1, 7, &token).await;
        groups.remove_role(1, 9, &token).await;

        let roles = groups.find(1).await.expect("group").roles;
        assert_eq!(roles, vec![Role::reference(7)]);
        assert_eq!(transport.requests()[1].body, Some(json!({"roleId": 7})));
    }
}
