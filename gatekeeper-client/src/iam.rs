//! Typed bindings for the IAM backend routes

use gatekeeper_core::{
    log_operation_start, Credentials, EntityId, GatekeeperError, GatekeeperResult, Group,
    PrincipalPermission, Resource, Role, Session, SimulationRequest, SimulationVerdict, UserDraft,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::api::{ApiRequest, Transport};
use crate::schema::{decode_entity, decode_list, decode_session, message_of};

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const MY_PERMISSIONS_PATH: &str = "/api/permissions/me/permissions";
pub const SIMULATE_PATH: &str = "/api/permissions/simulate-action";

const ALLOWED_FALLBACK: &str = "Action is permitted";
const DENIED_FALLBACK: &str = "Action not permitted";

/// One method per backend endpoint
#[derive(Clone)]
pub struct IamApi {
    transport: Arc<dyn Transport>,
}

impl IamApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn register(&self, draft: &UserDraft) -> GatekeeperResult<Session> {
        log_operation_start!("register", username = %draft.username);
        let request = ApiRequest::post(REGISTER_PATH).json(draft)?.anonymous();
        let label = request.label();
        let body = self.transport.execute(request).await?;
        decode_session(body, &label)
    }

    pub async fn login(&self, credentials: &Credentials) -> GatekeeperResult<Session> {
        log_operation_start!("login", username = %credentials.username);
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?.anonymous();
        let label = request.label();
        let body = self.transport.execute(request).await?;
        decode_session(body, &label)
    }

    /// Flattened `(module, action)` list of the logged-in principal
    pub async fn my_permissions(&self) -> GatekeeperResult<Vec<PrincipalPermission>> {
        let request = ApiRequest::get(MY_PERMISSIONS_PATH);
        let label = request.label();
        let body = self.transport.execute(request).await?;
        decode_list(body, "permissions", &label)
    }

    /// Ask the backend whether the principal may perform an action.
    ///
    /// A 2xx answer with `allowed: false` and any non-2xx answer other than a 401 are
    /// reported as a deny verdict, not as an error.
    pub async fn simulate_action(
        &self,
        simulation: &SimulationRequest,
    ) -> GatekeeperResult<SimulationVerdict> {
        log_operation_start!("simulate_action", module_id = simulation.module_id, action = %simulation.action);
        let request = ApiRequest::post(SIMULATE_PATH).json(simulation)?;

        match self.transport.execute(request).await {
            Ok(body) => {
                let allowed = body.get("allowed").and_then(Value::as_bool).unwrap_or(true);
                let fallback = if allowed {
                    ALLOWED_FALLBACK
                } else {
                    DENIED_FALLBACK
                };
                Ok(SimulationVerdict {
                    allowed,
                    message: message_of(&body).unwrap_or_else(|| fallback.to_string()),
                })
            }
            Err(GatekeeperError::Api { server_message, .. }) => Ok(SimulationVerdict {
                allowed: false,
                message: server_message.unwrap_or_else(|| DENIED_FALLBACK.to_string()),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn list<R: Resource>(&self) -> GatekeeperResult<Vec<R>> {
        let request = ApiRequest::get(R::PATH);
        let label = request.label();
        let body = self.transport.execute(request).await?;
        decode_list(body, R::COLLECTION, &label)
    }

    pub async fn create<R: Resource>(&self, draft: &R::Draft) -> GatekeeperResult<R> {
        let request = ApiRequest::post(R::PATH).json(draft)?;
        let label = request.label();
        let body = self.transport.execute(request).await?;
        decode_entity(body, R::SINGULAR, &label)
    }

    /// Replace an entity; the server's answer is the new cached value
    pub async fn update<R: Resource>(&self, entity: &R) -> GatekeeperResult<R> {
        let request = ApiRequest::put(R::item_path(entity.id())).json(entity)?;
        let label = request.label();
        let body = self.transport.execute(request).await?;
        decode_entity(body, R::SINGULAR, &label)
    }

    /// Delete an entity; resolves to the id that was removed
    pub async fn delete<R: Resource>(&self, id: EntityId) -> GatekeeperResult<EntityId> {
        self.transport
            .execute(ApiRequest::delete(R::item_path(id)))
            .await?;
        debug!(path = R::PATH, id, "Entity deleted");
        Ok(id)
    }

    pub async fn add_users_to_group(
        &self,
        group_id: EntityId,
        user_ids: &[EntityId],
    ) -> GatekeeperResult<()> {
        let path = format!("{}/users", Group::item_path(group_id));
        let request = ApiRequest::post(path).json(&json!({ "userIds": user_ids }))?;
        self.transport.execute(request).await?;
        Ok(())
    }

    pub async fn remove_user_from_group(
        &self,
        group_id: EntityId,
        user_id: EntityId,
    ) -> GatekeeperResult<()> {
        let path = format!("{}/users/{}", Group::item_path(group_id), user_id);
        self.transport.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn add_role_to_group(
        &self,
        group_id: EntityId,
        role_id: EntityId,
    ) -> GatekeeperResult<()> {
        let path = format!("{}/roles", Group::item_path(group_id));
        let request = ApiRequest::post(path).json(&json!({ "roleId": role_id }))?;
        self.transport.execute(request).await?;
        Ok(())
    }

    pub async fn remove_role_from_group(
        &self,
        group_id: EntityId,
        role_id: EntityId,
    ) -> GatekeeperResult<()> {
        let path = format!("{}/roles/{}", Group::item_path(group_id), role_id);
        self.transport.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub async fn add_permission_to_role(
        &self,
        role_id: EntityId,
        permission_id: EntityId,
    ) -> GatekeeperResult<()> {
        let path = format!("{}/permissions", Role::item_path(role_id));
        let request = ApiRequest::post(path).json(&json!({ "permissionId": permission_id }))?;
        self.transport.execute(request).await?;
        Ok(())
    }

    pub async fn remove_permission_from_role(
        &self,
        role_id: EntityId,
        permission_id: EntityId,
    ) -> GatekeeperResult<()> {
        let path = format!("{}/permissions/{}", Role::item_path(role_id), permission_id);
        self.transport.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }
}
