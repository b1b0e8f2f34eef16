use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{clients::ClientError, dao::session_store::SessionError, dao::storage::StorageError};

/// Errors produced by the service layer before they are mapped onto HTTP.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("session store unavailable")]
    Session(#[from] SessionError),
    #[error("profile storage unavailable")]
    Storage(#[from] StorageError),
    #[error("peer service call failed")]
    Peer(#[from] ClientError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("timed out: {0}")]
    Timeout(String),
}

/// HTTP-facing error kinds; handlers map these onto status codes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad input: {0}")]
    BadInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Session(source) => AppError::DependencyUnavailable(source.to_string()),
            ServiceError::Storage(source) => AppError::DependencyUnavailable(source.to_string()),
            ServiceError::Peer(source) => AppError::DependencyUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadInput(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::Timeout(message) => AppError::Timeout(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn maps_kinds_onto_statuses() {
        let cases = [
            (AppError::BadInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                AppError::DependencyUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
