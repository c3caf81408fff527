//! reqwest-backed transport

use async_trait::async_trait;
use gatekeeper_core::{ErrorContext, GatekeeperError, GatekeeperResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{create_http_client, handle_response_error, ApiClientConfig, ApiRequest, Transport};
use crate::navigation::Navigator;
use crate::session::SessionProvider;

/// HTTP transport bound to one backend origin
pub struct HttpTransport {
    client: reqwest::Client,
    config: ApiClientConfig,
    session: Arc<dyn SessionProvider>,
    navigator: Arc<dyn Navigator>,
}

impl HttpTransport {
    pub fn new(
        config: ApiClientConfig,
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> GatekeeperResult<Self> {
        let client = create_http_client(&config)?;

        info!("Created IAM transport for {}", config.base_url);

        Ok(Self {
            client,
            config,
            session,
            navigator,
        })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn bearer_token(&self) -> Option<String> {
        match self.session.bearer_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read stored session, sending request without credential");
                None
            }
        }
    }

    /// Drop every persisted session key and send the principal to the login route
    fn invalidate_session(&self) {
        if let Err(e) = self.session.clear_all() {
            e.log();
        }
        self.navigator.redirect_to_login();
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> GatekeeperResult<Value> {
        let url = self.config.url_for(&request.path);
        let started = Instant::now();

        let mut builder = self.client.request(request.method.into(), &url);
        if request.authenticated {
            if let Some(token) = self.bearer_token() {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| GatekeeperError::Network {
            message: e.to_string(),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_transport")
                .with_operation(&request.label())
                .with_suggestion("Check that the IAM backend is reachable"),
        })?;

        let status = response.status();
        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "IAM request finished"
        );

        if !status.is_success() {
            let error = handle_response_error(response, &request).await;
            if error.is_authentication_failure() {
                self.invalidate_session();
            }
            return Err(error);
        }

        let body = response.text().await.map_err(|e| GatekeeperError::Network {
            message: format!("Failed to read response body: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_transport").with_operation(&request.label()),
        })?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| GatekeeperError::Decode {
            endpoint: request.label(),
            message: e.to_string(),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_transport").with_operation("decode_body"),
        })
    }
}
