use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::attempt_status::StoreError;
use crate::services::hybrid_locator::LocateError;
use crate::services::monitor::MonitorError;
use crate::services::upload_pass::UploadPassError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    TooManyRequests(&'static str),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AttemptNotFound(_) | StoreError::ExamNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            StoreError::NotOwner { attempt_id } => {
                tracing::warn!(attempt_id = %attempt_id, "Attempt requested by another user");
                Self::Forbidden("Attempt belongs to another user")
            }
            StoreError::Database(err) => Self::internal(err, "Failed to load attempt data"),
        }
    }
}

impl From<LocateError> for ApiError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::PageOutOfRange { .. } => Self::BadRequest(err.to_string()),
            LocateError::EmptyAttempt | LocateError::NotFound { .. } => {
                Self::NotFound(err.to_string())
            }
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::SlotNotFound(_) => Self::NotFound(err.to_string()),
            MonitorError::NotHybrid(_) => Self::BadRequest(err.to_string()),
            MonitorError::Store(err) => err.into(),
        }
    }
}

impl From<UploadPassError> for ApiError {
    fn from(err: UploadPassError) -> Self {
        match err {
            UploadPassError::NoAttempt(_) => Self::NotFound(err.to_string()),
            UploadPassError::Locate(err) => err.into(),
            UploadPassError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::hybrid_locator::Direction;

    #[test]
    fn store_errors_map_to_http_statuses() {
        let not_found = ApiError::from(StoreError::AttemptNotFound("a-1".to_string()));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let not_owner = ApiError::from(StoreError::NotOwner { attempt_id: "a-1".to_string() });
        assert_eq!(not_owner.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn locate_errors_map_to_http_statuses() {
        let out_of_range = ApiError::from(LocateError::PageOutOfRange { page: 9, page_count: 2 });
        assert_eq!(out_of_range.into_response().status(), StatusCode::BAD_REQUEST);

        let missing =
            ApiError::from(LocateError::NotFound { direction: Direction::Next, page: 1 });
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unauthorized_sets_bearer_challenge() {
        let response = ApiError::Unauthorized("Invalid authentication credentials").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
