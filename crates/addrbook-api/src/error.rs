use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn record_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("Record with id={id} does not exist"))
    }
}

impl From<addrbook_core::Error> for AppError {
    fn from(error: addrbook_core::Error) -> Self {
        match error {
            addrbook_core::Error::NotFound(id) => Self::record_not_found(id),
            error if error.is_lock_timeout() => {
                tracing::warn!(%error, "Store busy");
                Self::Internal("The address book is busy, try again".to_string())
            }
            error => {
                tracing::warn!(%error, "Store operation failed");
                Self::Internal("Store operation failed".to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use addrbook_core::db::Database;
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    fn busy_error() -> addrbook_core::Error {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_with_busy_timeout(dir.path().join("addrbook.db"), Duration::ZERO)
            .unwrap();
        let mut holder = db.connect().unwrap();
        let mut waiter = db.connect().unwrap();
        let _held = Database::write_transaction(&mut holder).unwrap();
        Database::write_transaction(&mut waiter).unwrap_err()
    }

    #[test]
    fn core_not_found_maps_to_record_message() {
        let error = AppError::from(addrbook_core::Error::NotFound("abc".to_string()));
        assert_eq!(error.to_string(), "Record with id=abc does not exist");
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_hide_details() {
        let error = AppError::from(addrbook_core::Error::Database(
            "disk I/O error at /srv/data".to_string(),
        ));
        assert!(!error.to_string().contains("/srv/data"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn lock_timeout_maps_to_busy_message() {
        let core_error = busy_error();
        assert!(core_error.is_lock_timeout());

        let error = AppError::from(core_error);
        assert!(matches!(&error, AppError::Internal(_)));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("The address book is busy, try again"));
    }
}
