//! Error types for chatrelay
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure of a single call to the remote completion API
///
/// Each variant is a distinct failure kind; none of them is retried.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Failed to encode completion request: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Failed to reach completion API at {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Completion API error (status {status}): {body}")]
    Remote { status: u16, body: String },

    #[error("Failed to parse completion API response: {0}")]
    Deserialization(String),

    #[error("No response from completion API (zero choices returned)")]
    EmptyResult,
}

impl CompletionError {
    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Transport { .. } => "transport",
            Self::Remote { .. } => "remote",
            Self::Deserialization(_) => "deserialization",
            Self::EmptyResult => "empty_result",
        }
    }

    /// HTTP status reported to the caller for this failure
    ///
    /// Upstream 4xx/5xx statuses are relayed as-is. Any other non-200 upstream
    /// status becomes 502, and every other failure kind is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Remote { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            Self::Completion(err) => (err.status_code(), err.to_string()),
            Self::Config(msg) | Self::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_creates() {
        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Invalid request: invalid input");
    }

    #[test]
    fn test_remote_error_message_carries_status_and_body() {
        let err = CompletionError::Remote {
            status: 429,
            body: "slow down".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("slow down"));
    }

    #[test]
    fn test_completion_error_is_transparent_in_app_error() {
        let app: AppError = CompletionError::EmptyResult.into();
        assert_eq!(app.to_string(), CompletionError::EmptyResult.to_string());
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_payload_too_large_response_status() {
        let err = AppError::PayloadTooLarge("length limit exceeded".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_remote_error_relays_upstream_status() {
        let err = AppError::from(CompletionError::Remote {
            status: 503,
            body: String::new(),
        });
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_remote_error_with_non_error_status_maps_to_bad_gateway() {
        for status in [201, 204, 302] {
            let err = CompletionError::Remote {
                status,
                body: String::new(),
            };
            assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        }
    }

    #[test]
    fn test_other_completion_errors_are_internal_server_errors() {
        let errors = [
            CompletionError::Transport {
                endpoint: "http://localhost:1".to_string(),
                reason: "connection refused".to_string(),
            },
            CompletionError::Deserialization("expected value".to_string()),
            CompletionError::EmptyResult,
        ];
        for err in errors {
            assert_eq!(
                AppError::from(err).into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_completion_error_kinds_are_distinct() {
        let kinds = [
            CompletionError::Serialization(serde_json::from_str::<u8>("x").unwrap_err()).kind(),
            CompletionError::Transport {
                endpoint: String::new(),
                reason: String::new(),
            }
            .kind(),
            CompletionError::Remote {
                status: 500,
                body: String::new(),
            }
            .kind(),
            CompletionError::Deserialization(String::new()).kind(),
            CompletionError::EmptyResult.kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[tokio::test]
    async fn test_error_body_is_json_with_error_field() {
        let response = AppError::Validation("bad json".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "bad json");
    }
}
