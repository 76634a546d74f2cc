use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fluxfolio_jobs::StoreError;
use fluxfolio_orchestrator::OrchestratorError;
use fluxfolio_relay::RelayError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::session::SessionError;

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(SessionError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Orchestrator(err) => match err {
                OrchestratorError::MissingPrerequisite { .. }
                | OrchestratorError::AccountExists(_)
                | OrchestratorError::InvalidAccount(_)
                | OrchestratorError::InvalidAllocation(_)
                | OrchestratorError::Intent(_) => StatusCode::BAD_REQUEST,
                OrchestratorError::UserNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Relay(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store(StoreError::JobNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(SessionError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(OrchestratorError::MissingPrerequisite {
                user_id: "u1".to_string(),
                what: "a NEAR account",
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(OrchestratorError::UserNotFound("u9".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RelayError::Transport("refused".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(StoreError::DatabaseError("locked".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
