//! Per-entity resource stores
//!
//! A store caches one entity collection plus its request lifecycle flags. Every
//! operation reconciles the server's answer into the cache; nothing refetches behind
//! the caller's back.

use gatekeeper_client::IamApi;
use gatekeeper_core::{
    log_operation_error, log_operation_start, log_operation_success, run_cancellable,
    CancelToken, EntityId, GatekeeperResult, Group, Module, Permission, Resource, Role, User,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::reconcile;
use crate::state::{Lifecycle, OperationOutcome, StoreState};

pub type UserStore = ResourceStore<User>;
pub type GroupStore = ResourceStore<Group>;
pub type RoleStore = ResourceStore<Role>;
pub type ModuleStore = ResourceStore<Module>;
pub type PermissionStore = ResourceStore<Permission>;

/// Run one store operation through its lifecycle.
///
/// Errors never escape: they become the store's `{error, message}` state and a
/// `Rejected` outcome. A cancelled operation writes nothing but clears `loading`.
pub(crate) async fn drive<S, T, Fut, A>(
    state: &RwLock<S>,
    operation: &str,
    token: &CancelToken,
    future: Fut,
    apply: A,
) -> OperationOutcome<T>
where
    S: Lifecycle,
    Fut: Future<Output = GatekeeperResult<T>>,
    A: FnOnce(&mut S, &T),
{
    state.write().await.begin();
    log_operation_start!(operation);
    let started = Instant::now();

    match run_cancellable(future, token, operation).await {
        Ok(value) => {
            let mut guard = state.write().await;
            apply(&mut guard, &value);
            guard.fulfil();
            log_operation_success!(operation, elapsed_ms = started.elapsed().as_millis() as u64);
            OperationOutcome::Fulfilled(value)
        }
        Err(e) if e.is_cancelled() => {
            state.write().await.abandon();
            OperationOutcome::Cancelled
        }
        Err(e) => {
            log_operation_error!(operation, e, status = ?e.status());
            let message = e.user_message();
            state.write().await.reject(message.clone());
            OperationOutcome::Rejected(message)
        }
    }
}

/// Cached collection of one entity type
pub struct ResourceStore<R: Resource> {
    pub(crate) api: IamApi,
    pub(crate) state: Arc<RwLock<StoreState<R>>>,
}

impl<R: Resource> Clone for ResourceStore<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: Resource> ResourceStore<R> {
    pub fn new(api: IamApi) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Replace the cached list wholesale with the server's list
    pub async fn fetch_all(&self, token: &CancelToken) -> OperationOutcome<Vec<R>> {
        let operation = format!("fetch_{}", R::COLLECTION);
        drive(
            &self.state,
            &operation,
            token,
            self.api.list::<R>(),
            |state: &mut StoreState<R>, items: &Vec<R>| state.items = items.clone(),
        )
        .await
    }

    pub async fn create(&self, draft: &R::Draft, token: &CancelToken) -> OperationOutcome<R> {
        let operation = format!("create_{}", R::SINGULAR);
        drive(
            &self.state,
            &operation,
            token,
            self.api.create::<R>(draft),
            |state: &mut StoreState<R>, entity: &R| reconcile::append(&mut state.items, entity.clone()),
        )
        .await
    }

    pub async fn update(&self, entity: &R, token: &CancelToken) -> OperationOutcome<R> {
        let operation = format!("update_{}", R::SINGULAR);
        drive(
            &self.state,
            &operation,
            token,
            self.api.update::<R>(entity),
            |state: &mut StoreState<R>, updated: &R| {
                reconcile::replace(&mut state.items, updated.clone());
            },
        )
        .await
    }

    pub async fn delete(&self, id: EntityId, token: &CancelToken) -> OperationOutcome<EntityId> {
        let operation = format!("delete_{}", R::SINGULAR);
        drive(
            &self.state,
            &operation,
            token,
            self.api.delete::<R>(id),
            |state: &mut StoreState<R>, id: &EntityId| {
                reconcile::remove(&mut state.items, *id);
            },
        )
        .await
    }

    /// Explicit return to `Idle`
    pub async fn reset(&self) {
        self.state.write().await.reset();
    }

    pub async fn snapshot(&self) -> StoreState<R> {
        self.state.read().await.clone()
    }

    pub async fn items(&self) -> Vec<R> {
        self.state.read().await.items.clone()
    }

    pub async fn find(&self, id: EntityId) -> Option<R> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Apply a local patch to one cached entity
    pub(crate) async fn patch<F>(&self, id: EntityId, f: F)
    where
        F: FnOnce(&mut R),
    {
        let mut state = self.state.write().await;
        if let Some(entity) = state.items.iter_mut().find(|item| item.id() == id) {
            f(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_client::mock::{Reply, ScriptedTransport};
    use gatekeeper_core::{GatekeeperError, RoleDraft};
    use crate::state::OperationPhase;
    use serde_json::json;

    fn store(transport: Arc<ScriptedTransport>) -> RoleStore {
        ResourceStore::new(IamApi::new(transport))
    }

    #[tokio::test]
    async fn fetch_all_replaces_items() {
        let transport = Arc::new(ScriptedTransport::with_replies([Reply::Json(json!([
            {"id": 1, "name": "Admin"},
            {"id": 2, "name": "Viewer"}
        ]))]));
        let roles = store(transport);

        let outcome = roles.fetch_all(&CancelToken::never()).await;
        assert!(outcome.is_fulfilled());

        let state = roles.snapshot().await;
        let names: Vec<_> = state.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Admin", "Viewer"]);
        assert!(!state.loading);
        assert!(!state.error);
        assert_eq!(state.phase, OperationPhase::Fulfilled);
    }

    #[tokio::test]
    async fn rejected_fetch_keeps_items() {
        let transport = Arc::new(ScriptedTransport::with_replies([
            Reply::Json(json!({"roles": [{"id": 1, "name": "Admin"}]})),
            Reply::Status(500, None),
        ]));
        let roles = store(transport);
        let token = CancelToken::never();

        roles.fetch_all(&token).await;
        let outcome = roles.fetch_all(&token).await;
        assert_eq!(
            outcome,
            OperationOutcome::Rejected("Request failed with status code 500".to_string())
        );

        let state = roles.snapshot().await;
        assert_eq!(state.items.len(), 1);
        assert!(state.error);
        assert_eq!(state.message, "Request failed with status code 500");
        assert_eq!(state.phase, OperationPhase::Rejected);
    }

    #[tokio::test]
    async fn create_update_delete_reconcile() {
        let transport = Arc::new(ScriptedTransport::with_replies([
            Reply::Json(json!([{"id": 1, "name": "Admin"}, {"id": 2, "name": "Viewer"}])),
            Reply::Json(json!({"message": "Role created", "role": {"id": 3, "name": "Ops"}})),
            Reply::Json(json!({"id": 2, "name": "Reader"})),
            Reply::Json(json!({"message": "Role deleted"})),
        ]));
        let roles = store(transport.clone());
        let token = CancelToken::never();

        roles.fetch_all(&token).await;
        let created = roles
            .create(&RoleDraft { name: "Ops".to_string() }, &token)
            .await
            .value()
            .expect("created");
        assert_eq!(created.id, 3);

        let mut viewer = roles.find(2).await.expect("viewer cached");
        viewer.name = "Reader".to_string();
        assert!(roles.update(&viewer, &token).await.is_fulfilled());

        assert_eq!(roles.delete(1, &token).await, OperationOutcome::Fulfilled(1));

        let names: Vec<_> = roles.items().await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Reader", "Ops"]);

        let paths: Vec<_> = transport.requests().iter().map(|r| r.label()).collect();
        assert_eq!(
            paths,
            vec![
                "GET /api/roles",
                "POST /api/roles",
                "PUT /api/roles/2",
                "DELETE /api/roles/1"
            ]
        );
    }

    #[tokio::test]
    async fn deleting_unknown_id_still_fulfills() {
        let transport = Arc::new(ScriptedTransport::with_replies([
            Reply::Json(json!([{"id": 1, "name": "Admin"}])),
            Reply::Json(serde_json::Value::Null),
        ]));
        let roles = store(transport);
        let token = CancelToken::never();

        roles.fetch_all(&token).await;
        assert!(roles.delete(99, &token).await.is_fulfilled());
        assert_eq!(roles.items().await.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_writes_no_result() {
        let transport = Arc::new(ScriptedTransport::with_replies([Reply::Hang]));
        let roles = store(transport);
        let token = CancelToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let outcome = roles.fetch_all(&token).await;
        assert!(outcome.is_cancelled());

        let state = roles.snapshot().await;
        assert!(!state.loading);
        assert!(!state.error && !state.success);
        assert_eq!(state.phase, OperationPhase::Idle);
    }

    #[tokio::test]
    async fn transport_failure_becomes_state() {
        let transport = Arc::new(ScriptedTransport::with_replies([Reply::Error(
            GatekeeperError::Network {
                message: "connection refused".to_string(),
                source: None,
                context: gatekeeper_core::ErrorContext::new("test"),
            },
        )]));
        let roles = store(transport);

        let outcome = roles.fetch_all(&CancelToken::never()).await;
        assert_eq!(outcome, OperationOutcome::Rejected("connection refused".to_string()));

        roles.reset().await;
        let state = roles.snapshot().await;
        assert!(!state.error);
        assert_eq!(state.phase, OperationPhase::Idle);
    }
}
