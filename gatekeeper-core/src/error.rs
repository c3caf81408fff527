//! Unified error handling system
//!
//! Every failure a console operation can observe is one of these variants. Stores turn
//! them into `{error: true, message}` state through [`GatekeeperError::user_message`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type GatekeeperResult<T> = Result<T, GatekeeperError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the gatekeeper workspace
#[derive(Error, Debug)]
pub enum GatekeeperError {
    /// The request never produced an HTTP response
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The backend answered with a non-2xx status
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// The `message` field of the response body, when the server sent one
        server_message: Option<String>,
        context: ErrorContext,
    },

    /// The credential was missing, invalid or expired (401 class)
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    /// The response body did not have the shape the endpoint promises
    #[error("Unexpected response from {endpoint}: {message}")]
    Decode {
        endpoint: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Durable session storage could not be read or written
    #[error("Session storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    /// Local authorization gate refused the action; no request was sent
    #[error("You don't have permission to {action} {}.", .module.to_lowercase())]
    PermissionDenied {
        module: String,
        action: String,
        context: ErrorContext,
    },

    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatekeeperError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            GatekeeperError::Network { context, .. } => Some(context),
            GatekeeperError::Api { context, .. } => Some(context),
            GatekeeperError::Authentication { context, .. } => Some(context),
            GatekeeperError::Decode { context, .. } => Some(context),
            GatekeeperError::Config { context, .. } => Some(context),
            GatekeeperError::Storage { context, .. } => Some(context),
            GatekeeperError::Validation { context, .. } => Some(context),
            GatekeeperError::PermissionDenied { context, .. } => Some(context),
            _ => None,
        }
    }

    /// HTTP status of the failing response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GatekeeperError::Api { status, .. } => Some(*status),
            GatekeeperError::Authentication { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, GatekeeperError::Authentication { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatekeeperError::Cancelled { .. })
    }

    /// Text a store records in its `message` field.
    ///
    /// Server-supplied messages are passed through untouched; everything else falls
    /// back to the error's display form.
    pub fn user_message(&self) -> String {
        match self {
            GatekeeperError::Api { message, .. } => message.clone(),
            GatekeeperError::Authentication { message, .. } => message.clone(),
            GatekeeperError::Network { message, .. } => message.clone(),
            GatekeeperError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            GatekeeperError::Config { .. } | GatekeeperError::Storage { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or storage error"
                );
            }
            GatekeeperError::Network { .. } | GatekeeperError::Authentication { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Network or session error"
                );
            }
            GatekeeperError::PermissionDenied { .. } | GatekeeperError::Cancelled { .. } => {
                warn!(error = %self, "Action not performed");
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::GatekeeperError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'gatekeeper config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::GatekeeperError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::GatekeeperError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::GatekeeperError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_uses_console_wording() {
        let err = GatekeeperError::PermissionDenied {
            module: "Users".to_string(),
            action: "delete".to_string(),
            context: ErrorContext::new("gate"),
        };
        assert_eq!(err.to_string(), "You don't have permission to delete users.");
        assert_eq!(err.user_message(), "You don't have permission to delete users.");
    }

    #[test]
    fn api_error_exposes_status_and_server_message() {
        let err = GatekeeperError::Api {
            status: 409,
            message: "Role already exists".to_string(),
            server_message: Some("Role already exists".to_string()),
            context: ErrorContext::new("transport"),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.user_message(), "Role already exists");
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn macros_fill_context() {
        let err = storage_error!("disk full", "session_store");
        match &err {
            GatekeeperError::Storage { context, .. } => {
                assert_eq!(context.component, "session_store");
                assert!(!context.error_id.is_empty());
            }
            other => panic!("expected storage error, got {other:?}"),
        }

        let err = validation_error!("must not be empty", "name", "drafts");
        match err {
            GatekeeperError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("name")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
