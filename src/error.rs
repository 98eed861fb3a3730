//! Error types for ai-adapter.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::provider::{ProviderError, TaskType};

/// Result type alias for ai-adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ai-adapter.
///
/// Every failure surfaced to a caller is one of these variants; a request
/// either yields a complete `AiResponse` or exactly one `Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Provider '{provider}' does not support {task}")]
    UnsupportedOperation { provider: String, task: TaskType },

    #[error("No provider available for {task}: {reason}")]
    NoProviderAvailable { task: TaskType, reason: String },

    #[error("Provider '{provider}' failed during {task}: {message}")]
    ProviderCallFailed {
        provider: String,
        task: TaskType,
        message: String,
    },

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl Error {
    /// Attach provider and task context to a provider-level failure.
    pub fn from_provider(provider: &str, task: TaskType, err: ProviderError) -> Self {
        match err {
            ProviderError::Unsupported(task) => Error::UnsupportedOperation {
                provider: provider.to_string(),
                task,
            },
            other => Error::ProviderCallFailed {
                provider: provider.to_string(),
                task,
                message: other.to_string(),
            },
        }
    }

    /// Stable snake_case name of the error kind, used in API bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::UnsupportedOperation { .. } => "unsupported_operation",
            Error::NoProviderAvailable { .. } => "no_provider_available",
            Error::ProviderCallFailed { .. } => "provider_call_failed",
            Error::BadRequest(_) => "bad_request",
        }
    }

    /// The provider involved, when one had been selected.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Error::UnsupportedOperation { provider, .. }
            | Error::ProviderCallFailed { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// The task type the failing request asked for, when known.
    pub fn task(&self) -> Option<TaskType> {
        match self {
            Error::UnsupportedOperation { task, .. }
            | Error::NoProviderAvailable { task, .. }
            | Error::ProviderCallFailed { task, .. } => Some(*task),
            _ => None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::UnsupportedOperation { .. } => StatusCode::BAD_REQUEST,
            Error::NoProviderAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::ProviderCallFailed { .. } => StatusCode::BAD_GATEWAY,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
                "provider": self.provider(),
                "task": self.task(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
