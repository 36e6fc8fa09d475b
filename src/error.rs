use askama::Template;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::db::StorageError;
use crate::routes::home::Html;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(StorageError::Sql(e))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Storage(StorageError::Pool(e))
    }
}

#[derive(Template)]
#[template(path = "pages/error.html")]
pub struct ErrorTemplate {
    pub status_code: u16,
    pub status_text: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthenticated => return Redirect::to("/login").into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidCredentials => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let mut response = Html(ErrorTemplate {
            status_code: status.as_u16(),
            status_text: message,
        })
        .into_response();
        // Template render failures already map to 500; keep that over ours.
        if response.status() == StatusCode::OK {
            *response.status_mut() = status;
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};

    fn response_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn method_not_allowed_returns_405() {
        assert_eq!(
            response_status(AppError::MethodNotAllowed),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn validation_returns_400() {
        assert_eq!(
            response_status(AppError::validation("oops")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn invalid_credentials_returns_400() {
        assert_eq!(
            response_status(AppError::InvalidCredentials),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let response = AppError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn storage_returns_500() {
        let err = AppError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(response_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
