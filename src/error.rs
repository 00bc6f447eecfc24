use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::services::InboxError;

/// `axum`-compatible error handler.
#[derive(Error)]
pub struct Error {
    status: StatusCode,
    err: anyhow::Error,
}

impl Error {
    pub fn with_status(status: StatusCode, err: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            err: err.into(),
        }
    }

    pub fn unauthorized(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, err)
    }

    pub fn forbidden(err: impl Into<anyhow::Error>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            err,
        }
    }
}

impl From<InboxError> for Error {
    fn from(err: InboxError) -> Self {
        let status = match &err {
            InboxError::Validation(_) => StatusCode::BAD_REQUEST,
            InboxError::EntryNotFound => StatusCode::NOT_FOUND,
            InboxError::EntryNotOwner => StatusCode::FORBIDDEN,
            InboxError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            err: err.into(),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.status, self.err)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.err.fmt(f)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("{:?}", self.err);

        // Validation reasons are part of the admin API contract; other
        // errors only carry a body in debug builds.
        if self.status.is_client_error() || cfg!(debug_assertions) {
            Response::builder()
                .status(self.status)
                .body(Body::new(format!("{:?}", self.err)))
                .unwrap()
        } else {
            Response::builder()
                .status(self.status)
                .body(Body::empty())
                .unwrap()
        }
    }
}
