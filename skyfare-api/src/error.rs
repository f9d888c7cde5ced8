use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyfare_core::{CoreError, ErrorKind};

/// Seconds a client is told to wait after a lock timeout.
const RETRY_AFTER_SECONDS: &str = "1";

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    BusyError(String),
    TransitionError(String),
    InternalServerError(String),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFoundError(message),
            ErrorKind::Validation => AppError::ValidationError(message),
            ErrorKind::Conflict => AppError::ConflictError(message),
            ErrorKind::ConcurrencyBusy => AppError::BusyError(message),
            ErrorKind::InvalidTransition => AppError::TransitionError(message),
            ErrorKind::Internal => AppError::InternalServerError(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::BusyError(msg) => {
                tracing::warn!("Request timed out waiting for a lock: {}", msg);
                let body = Json(json!({ "error": msg }));
                let mut response = (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECONDS));
                return response;
            }
            AppError::TransitionError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
