//! Permission simulation
//!
//! Pure passthrough to the backend's decision; nothing is evaluated locally.

use gatekeeper_client::IamApi;
use gatekeeper_core::{Action, CancelToken, EntityId, SimulationRequest, SimulationVerdict};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::state::{impl_lifecycle, OperationOutcome, OperationPhase};
use crate::store::drive;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationState {
    pub verdict: Option<SimulationVerdict>,
    pub loading: bool,
    pub error: bool,
    pub success: bool,
    pub message: String,
    pub phase: OperationPhase,
}

impl_lifecycle!(for SimulationState);

#[derive(Clone)]
pub struct Simulator {
    api: IamApi,
    state: Arc<RwLock<SimulationState>>,
}

impl Simulator {
    pub fn new(api: IamApi) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(SimulationState::default())),
        }
    }

    /// Ask whether the principal may perform `action` on the module.
    ///
    /// Deny verdicts fulfil; only transport failures and 401s reject.
    pub async fn simulate(
        &self,
        module_id: EntityId,
        action: Action,
        token: &CancelToken,
    ) -> OperationOutcome<SimulationVerdict> {
        let request = SimulationRequest { module_id, action };
        self.state.write().await.verdict = None;

        drive(
            &self.state,
            "simulate_action",
            token,
            self.api.simulate_action(&request),
            |state: &mut SimulationState, verdict: &SimulationVerdict| {
                state.verdict = Some(verdict.clone())
            },
        )
        .await
    }

    pub async fn snapshot(&self) -> SimulationState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_client::mock::{Reply, ScriptedTransport};
    use serde_json::json;

    #[tokio::test]
    async fn verdicts_fulfil_either_way() {
        let transport = Arc::new(ScriptedTransport::with_replies([
            Reply::Json(json!({"allowed": true, "message": "Granted via role Admin"})),
            Reply::Status(403, None),
        ]));
        let simulator = Simulator::new(IamApi::new(transport.clone()));
        let token = CancelToken::never();

        let verdict = simulator.simulate(4, Action::Delete, &token).await.value().expect("verdict");
        assert!(verdict.allowed);
        assert_eq!(verdict.message, "Granted via role Admin");
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({"module_id": 4, "action": "delete"}))
        );

        let verdict = simulator.simulate(4, Action::Create, &token).await.value().expect("verdict");
        assert!(!verdict.allowed);
        assert_eq!(verdict.message, "Action not permitted");
        assert_eq!(simulator.snapshot().await.verdict, Some(verdict));
    }

    #[tokio::test]
    async fn expired_session_rejects() {
        let transport = Arc::new(ScriptedTransport::with_replies([Reply::Status(
            401,
            Some("Token expired".to_string()),
        )]));
        let simulator = Simulator::new(IamApi::new(transport));

        let outcome = simulator.simulate(1, Action::Read, &CancelToken::never()).await;
        assert_eq!(outcome, OperationOutcome::Rejected("Token expired".to_string()));
        assert!(simulator.snapshot().await.verdict.is_none());
    }
}
