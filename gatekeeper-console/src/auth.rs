//! Session/auth store
//!
//! Holds the logged-in principal and its flattened permission list. The principal is
//! seeded from the injected [`SessionProvider`] at construction; the permission list
//! starts empty and falls back to the durable cache until it is loaded.
//!
//! A transport that sees a 401 clears durable storage on its own. Every read here
//! checks the provider first, so an invalidated session also drops the in-memory
//! principal and permissions.

use gatekeeper_client::{IamApi, SessionProvider};
use gatekeeper_core::{
    CancelToken, Credentials, ErrorContext, GatekeeperError, GatekeeperResult,
    PrincipalPermission, Session, User, UserDraft,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::gate::Gate;
use crate::state::{impl_lifecycle, Lifecycle, OperationOutcome, OperationPhase};
use crate::store::drive;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthState {
    pub session: Option<Session>,
    pub permissions: Vec<PrincipalPermission>,
    pub loading: bool,
    pub error: bool,
    pub success: bool,
    pub message: String,
    pub phase: OperationPhase,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

impl_lifecycle!(for AuthState);

#[derive(Clone)]
pub struct AuthStore {
    api: IamApi,
    provider: Arc<dyn SessionProvider>,
    state: Arc<RwLock<AuthState>>,
}

impl AuthStore {
    pub fn new(api: IamApi, provider: Arc<dyn SessionProvider>) -> Self {
        let session = match provider.load_session() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored session");
                None
            }
        };

        Self {
            api,
            provider,
            state: Arc::new(RwLock::new(AuthState {
                session,
                ..AuthState::default()
            })),
        }
    }

    pub async fn register(&self, draft: &UserDraft, token: &CancelToken) -> OperationOutcome<User> {
        let provider = Arc::clone(&self.provider);
        let api = self.api.clone();
        let future = async move {
            let session = api.register(draft).await?;
            provider.store_session(&session)?;
            Ok(session)
        };
        self.authenticate("register", token, future).await
    }

    /// Log in and persist the returned session under the `user` key
    pub async fn login(
        &self,
        credentials: &Credentials,
        token: &CancelToken,
    ) -> OperationOutcome<User> {
        let provider = Arc::clone(&self.provider);
        let api = self.api.clone();
        let future = async move {
            let session = api.login(credentials).await?;
            provider.store_session(&session)?;
            Ok(session)
        };
        self.authenticate("login", token, future).await
    }

    async fn authenticate<F>(
        &self,
        operation: &str,
        token: &CancelToken,
        future: F,
    ) -> OperationOutcome<User>
    where
        F: std::future::Future<Output = GatekeeperResult<Session>>,
    {
        let outcome = drive(
            &self.state,
            operation,
            token,
            future,
            |state: &mut AuthState, session: &Session| state.session = Some(session.clone()),
        )
        .await;

        if outcome.is_rejected() {
            self.state.write().await.session = None;
        }
        if let OperationOutcome::Fulfilled(session) = &outcome {
            info!(username = %session.user.username, "Principal authenticated");
        }
        outcome.map(|session| session.user)
    }

    /// Forget the principal: drop both durable keys and the in-memory state
    pub async fn logout(&self) -> GatekeeperResult<()> {
        self.provider.clear_all()?;
        let mut state = self.state.write().await;
        state.session = None;
        state.permissions.clear();
        info!("Principal logged out");
        Ok(())
    }

    /// Fetch the principal's permissions and cache them durably
    pub async fn load_permissions(
        &self,
        token: &CancelToken,
    ) -> OperationOutcome<Vec<PrincipalPermission>> {
        self.reconcile().await;
        let has_credential = self
            .state
            .read()
            .await
            .session
            .as_ref()
            .and_then(Session::bearer_token)
            .is_some();

        let provider = Arc::clone(&self.provider);
        let api = self.api.clone();
        let future = async move {
            if !has_credential {
                return Err(GatekeeperError::Authentication {
                    message: "No auth token found".to_string(),
                    context: ErrorContext::new("auth_store").with_operation("load_permissions"),
                });
            }
            let permissions = api.my_permissions().await?;
            provider.store_permissions(&permissions)?;
            Ok(permissions)
        };

        drive(
            &self.state,
            "load_permissions",
            token,
            future,
            |state: &mut AuthState, permissions: &Vec<PrincipalPermission>| {
                state.permissions = permissions.clone()
            },
        )
        .await
    }

    /// In-memory permissions when loaded, else the durable cache
    pub async fn effective_permissions(&self) -> Vec<PrincipalPermission> {
        self.reconcile().await;
        let in_memory = self.state.read().await.permissions.clone();
        if !in_memory.is_empty() {
            return in_memory;
        }

        self.provider.load_permissions().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read cached permissions");
            Vec::new()
        })
    }

    /// Authorization gate over the effective permission list
    pub async fn gate(&self) -> Gate {
        Gate::new(self.effective_permissions().await)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.reconcile().await;
        self.state.read().await.user().cloned()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.reconcile().await;
        self.state
            .read()
            .await
            .session
            .as_ref()
            .and_then(Session::bearer_token)
            .is_some()
    }

    /// Forget the in-memory principal once durable storage holds no session
    async fn reconcile(&self) {
        match self.provider.load_session() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Could not read stored session");
                return;
            }
        }

        let mut state = self.state.write().await;
        if state.session.take().is_some() {
            state.permissions.clear();
            warn!("Stored session was invalidated, principal dropped");
        }
    }

    pub async fn reset(&self) {
        self.state.write().await.reset();
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }
}
