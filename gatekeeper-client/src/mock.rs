//! In-process transport that replays scripted replies
//!
//! Used by the console crate's tests to drive stores without a backend.

use async_trait::async_trait;
use gatekeeper_core::{ErrorContext, GatekeeperError, GatekeeperResult};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::{ApiRequest, Transport};
use crate::session::SessionProvider;

/// One scripted answer
#[derive(Debug)]
pub enum Reply {
    Json(Value),
    /// Non-2xx answer with an optional server `message`
    Status(u16, Option<String>),
    Error(GatekeeperError),
    /// Never resolves; used to exercise cancellation
    Hang,
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
    /// Cleared on a scripted 401, like the HTTP transport does
    session: Option<Arc<dyn SessionProvider>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn push(&self, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> GatekeeperResult<Value> {
        let label = request.label();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(401, message)) => {
                if let Some(session) = &self.session {
                    session.clear_all()?;
                }
                Err(GatekeeperError::Authentication {
                    message: message
                        .unwrap_or_else(|| "Request failed with status code 401".to_string()),
                    context: ErrorContext::new("scripted_transport").with_operation(&label),
                })
            }
            Some(Reply::Status(status, server_message)) => Err(GatekeeperError::Api {
                status,
                message: server_message
                    .clone()
                    .unwrap_or_else(|| format!("Request failed with status code {}", status)),
                server_message,
                context: ErrorContext::new("scripted_transport").with_operation(&label),
            }),
            Some(Reply::Error(error)) => Err(error),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(GatekeeperError::Network {
                message: format!("no scripted reply for {}", label),
                source: None,
                context: ErrorContext::new("scripted_transport").with_operation(&label),
            }),
        }
    }
}
