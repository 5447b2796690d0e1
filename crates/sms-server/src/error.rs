//! HTTP error mapping
//!
//! Structural problems answer with a short `{"detail": "..."}` body. Failed
//! pipeline runs answer with `{"detail": {"error", "traceback"}}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use sms_pipeline::RunResult;
use sms_workspace::WorkspaceError;

/// Handler error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Workspace layer rejected the request
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Request is malformed
    #[error("{0}")]
    BadRequest(String),

    /// JSON body is missing, malformed or has the wrong shape
    #[error("{}", .0.body_text())]
    Body(#[from] JsonRejection),

    /// Pipeline run failed or timed out
    #[error("pipeline run failed")]
    Pipeline(RunResult),

    /// Blocking task died
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct Detail<T> {
    detail: T,
}

#[derive(Serialize)]
struct RunFailure<'a> {
    error: Option<&'a str>,
    traceback: Option<&'a str>,
}

impl ApiError {
    /// HTTP status this error answers with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Workspace(WorkspaceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Workspace(WorkspaceError::AlreadyExists(_)) => StatusCode::CONFLICT,
            Self::Workspace(WorkspaceError::InvalidPath(_) | WorkspaceError::InvalidTarget(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Workspace(WorkspaceError::Io { .. }) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(rejection) => rejection.status(),
            Self::Pipeline(result) if result.timed_out() => StatusCode::GATEWAY_TIMEOUT,
            Self::Pipeline(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Pipeline(result) => {
                let body = Detail {
                    detail: RunFailure {
                        error: result.error(),
                        traceback: result.traceback(),
                    },
                };
                (status, Json(body)).into_response()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "request failed");
                }
                (status, Json(Detail { detail: other.to_string() })).into_response()
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Handler result
pub type ApiResult<T> = Result<T, ApiError>;
