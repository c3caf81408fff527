//! Transport layer for the IAM backend
//!
//! Every backend call goes through a [`Transport`]. The HTTP implementation attaches the
//! stored bearer credential and turns a 401 into a global session invalidation.

use async_trait::async_trait;
use gatekeeper_core::{ApiSettings, ErrorContext, GatekeeperError, GatekeeperResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub mod http;


pub use http::HttpTransport;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend origin, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Request timeout; `None` means the request may wait indefinitely
    pub timeout_seconds: Option<u64>,
    pub user_agent: String,
    /// Additional headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from(&ApiSettings::default())
    }
}

impl From<&ApiSettings> for ApiClientConfig {
    fn from(settings: &ApiSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            timeout_seconds: settings.timeout_seconds,
            user_agent: settings.user_agent.clone(),
            headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set additional header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Absolute URL for a backend route such as `/api/users`
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single backend call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    /// Whether the stored bearer credential is attached
    pub authenticated: bool,
}

impl ApiRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> GatekeeperResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Send without the bearer credential (register, login)
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Label used in logs and error contexts, e.g. `GET /api/users`
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Request/response channel to the IAM backend
///
/// Implementations return the decoded JSON body of a 2xx response (`Value::Null` for
/// an empty body) and map everything else onto [`GatekeeperError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> GatekeeperResult<Value>;
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &ApiClientConfig) -> GatekeeperResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            GatekeeperError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    for (key, value) in &config.headers {
        let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            GatekeeperError::Config {
                message: format!("Invalid header name '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?;

        let header_value =
            reqwest::header::HeaderValue::from_str(value).map_err(|e| GatekeeperError::Config {
                message: format!("Invalid header value for '{}': {}", key, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            })?;

        headers.insert(header_name, header_value);
    }

    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = config.timeout_seconds {
        builder = builder.timeout(std::time::Duration::from_secs(timeout));
    }

    builder.build().map_err(|e| GatekeeperError::Config {
        message: format!("Failed to create HTTP client: {}", e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("http_client").with_operation("create_client"),
    })
}

/// Pull a human-readable message out of an error response body.
///
/// Returns the body's `message` field when present and the fallback text for
/// the caller to use otherwise.
pub(crate) fn extract_error_message(status: u16, body: &str) -> (Option<String>, String) {
    let server_message = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match server_message {
        Some(message) => (Some(message.clone()), message),
        None => (None, format!("Request failed with status code {}", status)),
    }
}

/// Helper function to turn a non-2xx response into an error
pub(crate) async fn handle_response_error(
    response: reqwest::Response,
    request: &ApiRequest,
) -> GatekeeperError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let (server_message, message) = extract_error_message(status, &body);

    let context = ErrorContext::new("api_client")
        .with_operation(&request.label())
        .with_metadata("status", &status.to_string());

    if status == 401 {
        return GatekeeperError::Authentication {
            message,
            context: context.with_suggestion("Log in again"),
        };
    }

    GatekeeperError::Api {
        status,
        message,
        server_message,
        context: context.with_suggestion(match status {
            403 => "The backend refused the action for this principal",
            404 => "The entity no longer exists; refresh the list",
            409 => "The entity conflicts with an existing one",
            _ => "Check network connectivity and API status",
        }),
    }
}
