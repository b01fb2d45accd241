use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Request-terminal failures surfaced by the auth, sensor and account
/// services. Each variant maps to exactly one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("access denied")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    /// The access token failed verification but the refresh cookie was
    /// valid. Carries a freshly minted access token so the client can
    /// retry without re-authenticating.
    #[error("access token expired")]
    AccessExpired { access_token: String },

    #[error("token revoked")]
    Revoked,

    #[error("access denied")]
    Forbidden,

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signature timestamp outside accepted window")]
    Expired,

    /// Store I/O failure or timeout. Safe for the caller to retry.
    #[error(transparent)]
    Transient(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::BAD_REQUEST,
            AppError::AccessExpired { .. } => StatusCode::UNAUTHORIZED,
            AppError::Revoked => StatusCode::FORBIDDEN,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidSignature => StatusCode::FORBIDDEN,
            AppError::Expired => StatusCode::UNAUTHORIZED,
            AppError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::AccessExpired { access_token } => {
                json!({ "error": self.to_string(), "accessToken": access_token })
            }
            AppError::Transient(e) => {
                error!(error = %e, "store operation failed");
                json!({ "error": "internal error" })
            }
            AppError::Internal(msg) => {
                error!(error = %msg, "internal error");
                json!({ "error": "internal error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
