use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub status: u16,
}

/// Map domain errors to HTTP responses. The 401/403 split is load
/// bearing: clients distinguish "log in" from "not allowed".
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error = match err {
        AppError::BadRequest(_) => "validation_error",
        AppError::Unauthorized => "authentication_error",
        AppError::Forbidden => "authorization_error",
        AppError::NotFound => "not_found_error",
        AppError::Broker(_) => "broker_error",
        AppError::Config(_)
        | AppError::StartServer(_)
        | AppError::Database(_)
        | AppError::Blob(_) => "server_error",
    };

    // Internal failure detail stays in the logs, not the response body.
    let message = if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string()
    } else {
        err.to_string()
    };

    (status, ErrorResponse {
        error,
        message,
        status: status.as_u16(),
    })
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(map_error(&AppError::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(map_error(&AppError::Forbidden).0, StatusCode::FORBIDDEN);
        assert_eq!(
            map_error(&AppError::Unauthorized).0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            map_error(&AppError::BadRequest("x".into())).0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn server_errors_do_not_leak_detail() {
        let (_, body) = map_error(&AppError::Blob("s3 credentials rejected".into()));
        assert!(!body.message.contains("credentials"));
    }
}
