use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use cas_types::ObjectMetadata;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("store error: {0}")]
    Store(#[from] cas_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Request-level failure, rendered as a status code and a short body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    NotFound,
    /// Dedup hit. The metadata is still returned to the client.
    Conflict(ObjectMetadata),
    Corrupt,
    Internal,
}

impl ApiError {
    /// Log an unexpected failure and turn it into a 500.
    pub fn internal(op: &'static str, err: impl Display) -> Self {
        tracing::error!(op, error = %err, "request failed");
        Self::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Conflict(metadata) => (StatusCode::CONFLICT, Json(metadata)).into_response(),
            Self::Corrupt => (StatusCode::SERVICE_UNAVAILABLE, "file corrupt").into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_types::ContentAddress;

    #[test]
    fn status_mapping() {
        let meta = ObjectMetadata::new(ContentAddress::from_digest([1; 16]), 1);
        let cases = [
            (ApiError::BadRequest("bad md5"), StatusCode::BAD_REQUEST),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
            (ApiError::Conflict(meta), StatusCode::CONFLICT),
            (ApiError::Corrupt, StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn store_error_converts() {
        let err: ServerError = cas_store::StoreError::NotFound(ContentAddress::from_digest([0; 16])).into();
        assert!(err.to_string().starts_with("store error"));
    }
}
