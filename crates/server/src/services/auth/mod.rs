//! Authentication service.
//!
//! Password registration and login, plus profile updates. Google accounts
//! exist (they are created by the OAuth flow) but never log in with a
//! password.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use techmart_core::api::{LoginRequest, RegisterRequest, UpdateAccountRequest};
use techmart_core::{AccountId, AuthProvider, Email, Role};

use crate::db::{AccountRepository, RepositoryError};
use crate::models::{Account, NewAccount, ProfileUpdate};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum phone number length.
const MIN_PHONE_LENGTH: usize = 8;

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Register a local account with the `user` role.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingFields` if any field is absent
    /// - `AuthError::InvalidEmail` if the email format is invalid
    /// - `AuthError::UserAlreadyExists` if the email is already registered
    /// - `AuthError::WeakPassword` / `AuthError::InvalidPhone` on short values
    pub async fn register(&self, request: &RegisterRequest) -> Result<Account, AuthError> {
        self.register_with_role(request, Role::User).await
    }

    /// Register a local account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    #[tracing::instrument(skip(self, request), fields(email = ?request.email))]
    pub async fn register_with_role(
        &self,
        request: &RegisterRequest,
        role: Role,
    ) -> Result<Account, AuthError> {
        let (Some(username), Some(email), Some(password), Some(phone)) = (
            non_blank(request.username.as_deref()),
            non_blank(request.email.as_deref()),
            request.password.as_deref().filter(|p| !p.is_empty()),
            non_blank(request.phone_number.as_deref()),
        ) else {
            return Err(AuthError::MissingFields(
                "All fields username, email, password, phoneNumber are required.",
            ));
        };

        let email = Email::parse(email)?;
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }
        validate_password(password)?;
        validate_phone(phone)?;

        let password_hash = hash_password(password)?;
        let account = self
            .accounts
            .create(NewAccount {
                username: username.to_owned(),
                email,
                password_hash: Some(password_hash),
                phone_number: Some(phone.to_owned()),
                role,
                provider: AuthProvider::Local,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(account_id = %account.id, role = %account.role, "Account registered");
        Ok(account)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingFields` if email or password is absent
    /// - `AuthError::UserNotFound` if no account has this email
    /// - `AuthError::GoogleAccount` for accounts without a local password
    /// - `AuthError::InvalidCredentials` if the password is wrong
    #[tracing::instrument(skip(self, request), fields(email = ?request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<Account, AuthError> {
        let (Some(email), Some(password)) = (
            non_blank(request.email.as_deref()),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingFields(
                "Both email and password are required",
            ));
        };

        let email = Email::parse(email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let hash = match (account.provider, account.password_hash.as_deref()) {
            (AuthProvider::Local, Some(hash)) => hash,
            _ => return Err(AuthError::GoogleAccount),
        };
        verify_password(password, hash)?;

        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(account)
    }

    /// Load the account behind a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn account(&self, id: AccountId) -> Result<Account, AuthError> {
        self.accounts
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// - `AuthError::NothingToUpdate` for an empty request
    /// - `AuthError::GoogleProfileLocked` when a Google account changes anything but the phone
    /// - `AuthError::InvalidEmail` / `AuthError::InvalidPhone` on invalid values
    /// - `AuthError::UserAlreadyExists` when the new email is taken
    #[tracing::instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: AccountId,
        request: &UpdateAccountRequest,
    ) -> Result<Account, AuthError> {
        let account = self.account(id).await?;

        let update = ProfileUpdate {
            username: non_blank(request.username.as_deref()).map(str::to_owned),
            email: non_blank(request.email.as_deref())
                .map(Email::parse)
                .transpose()?,
            phone_number: non_blank(request.phone_number.as_deref()).map(str::to_owned),
        };
        if update.is_empty() {
            return Err(AuthError::NothingToUpdate);
        }
        if account.provider == AuthProvider::Google
            && (update.username.is_some() || update.email.is_some())
        {
            return Err(AuthError::GoogleProfileLocked);
        }
        if let Some(phone) = &update.phone_number {
            validate_phone(phone)?;
        }

        let updated = self
            .accounts
            .update_profile(id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;
        tracing::info!(account_id = %updated.id, "Profile updated");
        Ok(updated)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), AuthError> {
    if phone.chars().count() < MIN_PHONE_LENGTH {
        return Err(AuthError::InvalidPhone(format!(
            "phoneNumber must be at least {MIN_PHONE_LENGTH} characters long"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
