use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;

/// Transport-level failure talking to an upstream bank or catalog source.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },
    #[error("upstream response body could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Machine-readable descriptor, safe to embed in API payloads.
    pub fn diagnostic(&self) -> UpstreamDiagnostic {
        match self {
            UpstreamError::Http(err) => UpstreamDiagnostic {
                status: err.status().map(|status| status.as_u16()),
                message: err.to_string(),
                details: None,
            },
            UpstreamError::Status {
                status,
                message,
                body,
            } => UpstreamDiagnostic {
                status: Some(*status),
                message: message.clone(),
                details: body.clone(),
            },
            UpstreamError::Decode(err) => UpstreamDiagnostic {
                status: None,
                message: err.to_string(),
                details: None,
            },
        }
    }
}

/// Serializable diagnostics attached to degraded rows (e.g. `balance_error`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamDiagnostic {
    pub status: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl UpstreamDiagnostic {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: Some(404),
            message: message.into(),
            details: None,
        }
    }
}

/// Request-scoped error taxonomy surfaced to API clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authorization header is required")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("bank API is unavailable: {message}")]
    UpstreamUnavailable { message: String },
    #[error("{message}")]
    UpstreamRejected {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            ApiError::Validation { details, .. } | ApiError::UpstreamRejected { details, .. } => {
                details.clone()
            }
            _ => None,
        };

        let mut body = json!({ "error": self.to_string() });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(value: UpstreamError) -> Self {
        match value {
            UpstreamError::Status {
                status,
                message,
                body,
            } => ApiError::UpstreamRejected {
                status,
                message,
                details: body,
            },
            UpstreamError::Http(err) => ApiError::UpstreamUnavailable {
                message: if err.is_timeout() {
                    "no response received (timeout)".to_string()
                } else {
                    err.to_string()
                },
            },
            UpstreamError::Decode(err) => ApiError::UpstreamUnavailable {
                message: format!("unreadable response body: {err}"),
            },
        }
    }
}

/// Process-level error for startup and serving, used by the API binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("request error: {0}")]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("loan".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::validation("bad amount").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("no product".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::UpstreamUnavailable {
                message: "down".into()
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::UpstreamRejected {
                status: 422,
                message: "rejected".into(),
                details: None,
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn rejected_upstream_propagates_status_and_body() {
        let upstream = UpstreamError::Status {
            status: 403,
            message: "consent expired".into(),
            body: Some(json!({ "error": "consent expired" })),
        };
        let diagnostic = upstream.diagnostic();
        assert_eq!(diagnostic.status, Some(403));

        match ApiError::from(upstream) {
            ApiError::UpstreamRejected {
                status, details, ..
            } => {
                assert_eq!(status, 403);
                assert!(details.is_some());
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
