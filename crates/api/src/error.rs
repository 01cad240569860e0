use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use workdrive_bridge_services::cloud_storage::WorkDriveError;
use workdrive_bridge_services::oauth::OAuthError;
use workdrive_bridge_services::session::SessionError;
use workdrive_bridge_services::token::TokenError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    /// WorkDrive kept answering 401 after the retry ceiling.
    UpstreamAuth(String),
    /// Failed WorkDrive call; `details` carries the upstream body or the
    /// transport error text.
    Upstream {
        message: String,
        details: serde_json::Value,
    },
    Token(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::UpstreamAuth(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_auth", msg, None)
            }
            ApiError::Upstream { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream",
                message,
                Some(details),
            ),
            ApiError::Token(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "token_error", msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg, None),
        };

        let body = ErrorResponse {
            success: false,
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkDriveError> for ApiError {
    fn from(err: WorkDriveError) -> Self {
        match err {
            WorkDriveError::Unauthorized { .. } => ApiError::UpstreamAuth(err.to_string()),
            WorkDriveError::NotFound => ApiError::NotFound("File not found in WorkDrive".to_string()),
            WorkDriveError::Upstream { status, body } => ApiError::Upstream {
                message: format!("WorkDrive returned HTTP {}", status),
                details: body,
            },
            WorkDriveError::Token(e) => e.into(),
            WorkDriveError::Transport(e) => ApiError::Upstream {
                message: if e.is_timeout() {
                    "WorkDrive request timed out".to_string()
                } else {
                    "WorkDrive request failed".to_string()
                },
                details: serde_json::Value::String(e.to_string()),
            },
            WorkDriveError::InvalidResponse(msg) => ApiError::Upstream {
                message: "Unexpected WorkDrive response".to_string(),
                details: serde_json::Value::String(msg),
            },
            WorkDriveError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Token(err.to_string())
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::NotConfigured => ApiError::Internal(err.to_string()),
            OAuthError::Exchange(_) => ApiError::Token(err.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
