//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures infrastructure-class
//! errors to Sentry before responding to the client. All route handlers
//! return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use marigold_checkout::error::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout core operation failed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session layer failed.
    #[error("session error: {0}")]
    Session(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => match err {
                CheckoutError::Unauthorized => StatusCode::UNAUTHORIZED,
                CheckoutError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::ConfirmFailed(_) => StatusCode::CONFLICT,
                CheckoutError::MissingSecret
                | CheckoutError::Network(_)
                | CheckoutError::Server { .. } => StatusCode::BAD_GATEWAY,
                CheckoutError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Session(_)
                | Self::Checkout(
                    CheckoutError::MissingSecret
                        | CheckoutError::Network(_)
                        | CheckoutError::Server { .. }
                        | CheckoutError::Unknown(_)
                )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture infrastructure errors to Sentry
        if self.is_infrastructure() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Clients get the class-level user message, never internals.
        let (message, requires_login) = match &self {
            Self::Checkout(err) => (err.user_message(), err.requires_login()),
            Self::Session(_) => ("Internal server error".to_string(), false),
            Self::BadRequest(msg) => (msg.clone(), false),
            Self::NotFound(msg) => (format!("Not found: {msg}"), false),
        };

        let body = Json(json!({
            "error": message,
            "requiresLogin": requires_login,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_error_status_codes() {
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::Unauthorized)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::Validation {
                fields: vec!["email".into()]
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::ConfirmFailed(
                "declined".into()
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::Network("x".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::Server {
                status: 503,
                message: String::new()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::MissingSecret)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_shell_error_status_codes() {
        assert_eq!(
            get_status(AppError::BadRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::NotFound("checkout".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Session("store".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_infrastructure_classification() {
        assert!(AppError::Checkout(CheckoutError::Network("x".into())).is_infrastructure());
        assert!(AppError::Session("x".into()).is_infrastructure());
        assert!(!AppError::Checkout(CheckoutError::Unauthorized).is_infrastructure());
        assert!(
            !AppError::Checkout(CheckoutError::Validation { fields: vec![] }).is_infrastructure()
        );
        assert!(!AppError::NotFound("x".into()).is_infrastructure());
    }
}
