//! Account domain types.

use chrono::{DateTime, Utc};

use techmart_core::api::AccountView;
use techmart_core::{AccountId, AuthProvider, Email, Role};

/// A registered account (domain type).
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: Email,
    /// Argon2 PHC string; `None` for Google accounts.
    pub password_hash: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub provider: AuthProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The public view returned by the API.
    #[must_use]
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            role: self.role,
            provider: self.provider,
            created_at: self.created_at,
        }
    }
}

/// Fields for inserting an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: Email,
    pub password_hash: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub provider: AuthProvider,
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<Email>,
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    /// Whether applying this update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.phone_number.is_none()
    }
}
