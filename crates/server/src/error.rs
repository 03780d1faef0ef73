//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is `{"success": false, "message"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use techmart_core::api::ApiMessage;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::images::ImageHostError;
use crate::services::orders::OrderError;

/// Message sent for every unexpected failure.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or profile operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request (body, query string or multipart form).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

fn image_error(err: &ImageHostError) -> (StatusCode, String) {
    match err {
        ImageHostError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        ImageHostError::Upstream { status, message } => (
            StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            message.clone(),
        ),
        ImageHostError::Transport(_) | ImageHostError::InvalidResponse(_) => {
            (StatusCode::BAD_GATEWAY, "Image upload failed".to_owned())
        }
    }
}

fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
}

impl AppError {
    /// Status code and client-facing message.
    ///
    /// Internal details never reach the client.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(_) | Self::Session(_) => internal(),
            Self::Auth(err) => match err {
                AuthError::MissingFields(msg) => (StatusCode::BAD_REQUEST, (*msg).to_owned()),
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                AuthError::WeakPassword(msg) | AuthError::InvalidPhone(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists.".to_owned(),
                ),
                AuthError::UserNotFound => (
                    StatusCode::NOT_FOUND,
                    "User with this email does not exist".to_owned(),
                ),
                AuthError::GoogleAccount => (
                    StatusCode::BAD_REQUEST,
                    "This user can only log in using Google".to_owned(),
                ),
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Incorrect password".to_owned())
                }
                AuthError::GoogleProfileLocked | AuthError::NothingToUpdate => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                AuthError::Repository(_) | AuthError::PasswordHash => internal(),
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CatalogError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                CatalogError::Image(image) => image_error(image),
                CatalogError::Repository(_) => internal(),
            },
            Self::Cart(err) => match err {
                CartError::ZeroQuantity | CartError::QuantityOverflow => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                CartError::ProductNotFound | CartError::NotInCart => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                CartError::Repository(_) => internal(),
            },
            Self::Order(err) => match err {
                OrderError::Checkout(_)
                | OrderError::UnknownProduct(_)
                | OrderError::TotalTooLarge
                | OrderError::InvalidId
                | OrderError::Transition(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                OrderError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                OrderError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
                OrderError::Conflict => (StatusCode::CONFLICT, err.to_string()),
                OrderError::Repository(_) => internal(),
            },
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(ApiMessage::error(message))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
