use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        crate::middleware::error_handling::into_response(self).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// No valid session ("log in", 401). Kept distinct from Forbidden
    /// so clients can tell the two denials apart.
    #[error("unauthenticated")]
    Unauthorized,

    /// Actor lacks rights over the target entity (403).
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("blob store error: {0}")]
    Blob(String),

    /// Publish to the broker failed. Always caught and logged at the
    /// pub/sub gateway; never aborts a persistence path.
    #[error("broker unavailable: {0}")]
    Broker(String),
}

impl AppError {
    /// Whether a retry may succeed (TransientIO in the error taxonomy).
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            AppError::Blob(_) | AppError::Broker(_) => true,
            _ => false,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::NotFound => 404,
            AppError::Broker(_) => 502,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Blob(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_and_authorization_denials_stay_distinct() {
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::Forbidden.status_code(), 403);
    }

    #[test]
    fn broker_and_blob_failures_are_retryable() {
        assert!(AppError::Broker("down".into()).is_retryable());
        assert!(AppError::Blob("timeout".into()).is_retryable());
        assert!(!AppError::NotFound.is_retryable());
        assert!(!AppError::Forbidden.is_retryable());
    }
}
