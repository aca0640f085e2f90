use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use snip_store::ShortenerError;
use thiserror::Error;
use tracing::error;

pub const CODE_NOT_FOUND: &str = "Short code not found";

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Short code not found")]
    NotFound,
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound => (StatusCode::NOT_FOUND, CODE_NOT_FOUND.to_string()),
            AppError::Shortener(err) => match err {
                ShortenerError::InvalidArgument(message) => (StatusCode::BAD_REQUEST, message),
                ShortenerError::NotFound(_) => (StatusCode::NOT_FOUND, CODE_NOT_FOUND.to_string()),
                err @ ShortenerError::Conflict(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
                }
                err @ ShortenerError::Exhausted { .. } => {
                    (StatusCode::INSUFFICIENT_STORAGE, err.to_string())
                }
                err @ ShortenerError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snip_core::StorageError;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(
            status_of(ShortenerError::InvalidArgument("URL cannot be empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ShortenerError::NotFound("abc".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ShortenerError::from(StorageError::Busy("locked".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ShortenerError::Exhausted { attempts: 16 }),
            StatusCode::INSUFFICIENT_STORAGE
        );
        assert_eq!(
            status_of(ShortenerError::from(StorageError::Io("disk full".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn request_errors_map_to_statuses() {
        assert_eq!(status_of(AppError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::bad_request("URL is required")),
            StatusCode::BAD_REQUEST
        );
    }
}
