//! Account repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use techmart_core::{AccountId, Email};

use super::{AccountRepository, RepositoryError};
use crate::models::{Account, NewAccount, ProfileUpdate};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, phone_number, role, provider, \
                               created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i32,
    username: String,
    email: String,
    password_hash: Option<String>,
    phone_number: Option<String>,
    role: String,
    provider: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AccountId::new(row.id),
            username: row.username,
            email: Email::parse(&row.email).map_err(|e| RepositoryError::corrupt("email", e))?,
            password_hash: row.password_hash,
            phone_number: row.phone_number,
            role: row.role.parse().map_err(|e| RepositoryError::corrupt("role", e))?,
            provider: row
                .provider
                .parse()
                .map_err(|e| RepositoryError::corrupt("provider", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for account database operations.
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO accounts (username, email, password_hash, phone_number, role, provider) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&account.username)
            .bind(account.email.as_str())
            .bind(account.password_hash.as_deref())
            .bind(account.phone_number.as_deref())
            .bind(account.role.as_str())
            .bind(account.provider.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "email"))?
            .try_into()
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<Account, RepositoryError> {
        let sql = format!(
            "UPDATE accounts SET \
                 username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 phone_number = COALESCE($4, phone_number), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(update.username.as_deref())
            .bind(update.email.as_ref().map(Email::as_str))
            .bind(update.phone_number.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "email"))?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }
}
