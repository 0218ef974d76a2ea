//! HTTP error mapping for the empresa API.
//!
//! Bodies follow the `{"detail": "..."}` shape used by every error response.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::DatabaseError;

pub const EMPRESA_NOT_FOUND: &str = "Empresa não encontrada";
pub const OBRIGACAO_NOT_FOUND: &str = "Obrigação não encontrada";

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Errors a handler can surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    /// Request body or path failed to parse.
    #[error("{0}")]
    Validation(String),

    /// Duplicate cnpj or email.
    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Constraint(msg) => {
                tracing::debug!(error = %msg, "Uniqueness constraint rejected write");
                let field = if msg.contains("cnpj") {
                    "cnpj"
                } else if msg.contains("email") {
                    "email"
                } else {
                    "registro"
                };
                ApiError::Conflict(format!("Já existe uma empresa com este {field}"))
            }
            other => {
                tracing::error!(error = %other, "Storage failure");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
