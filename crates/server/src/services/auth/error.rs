//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and profile operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required request field was absent or blank.
    #[error("{0}")]
    MissingFields(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] techmart_core::EmailError),

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Phone number too short.
    #[error("{0}")]
    InvalidPhone(String),

    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account for the given email.
    #[error("user not found")]
    UserNotFound,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password login attempted on a Google account.
    #[error("account uses Google sign-in")]
    GoogleAccount,

    /// Google accounts may only change their phone number.
    #[error("Google accounts can only update phoneNumber")]
    GoogleProfileLocked,

    /// Update request without any field.
    #[error("No fields to update")]
    NothingToUpdate,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
