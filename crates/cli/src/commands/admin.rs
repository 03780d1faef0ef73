//! Admin account management.
//!
//! Public registration only ever creates `user` accounts; admins are created
//! here, with the same validation and password hashing as registration.

use std::sync::Arc;

use techmart_core::Role;
use techmart_core::api::RegisterRequest;
use techmart_server::db::AccountRepository;
use techmart_server::db::Repositories;
use techmart_server::models::Account;
use techmart_server::services::auth::AuthService;

use super::{CommandError, connect};

/// Create an admin account in the configured database.
pub async fn create(
    email: &str,
    username: &str,
    password: &str,
    phone: &str,
) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repos = Repositories::postgres(&pool);

    let account = create_with(repos.accounts, email, username, password, phone).await?;
    tracing::info!(
        "Admin account created! ID: {}, Email: {}",
        account.id,
        account.email
    );
    Ok(())
}

async fn create_with(
    accounts: Arc<dyn AccountRepository>,
    email: &str,
    username: &str,
    password: &str,
    phone: &str,
) -> Result<Account, CommandError> {
    let request = RegisterRequest {
        username: Some(username.to_owned()),
        email: Some(email.to_owned()),
        password: Some(password.to_owned()),
        phone_number: Some(phone.to_owned()),
    };
    Ok(AuthService::new(accounts)
        .register_with_role(&request, Role::Admin)
        .await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use techmart_server::services::auth::AuthError;

    use super::*;

    #[tokio::test]
    async fn test_creates_admin() {
        let repos = Repositories::in_memory();
        let account = create_with(
            repos.accounts.clone(),
            "Root@Example.com",
            "root",
            "password123",
            "0788000000",
        )
        .await
        .unwrap();
        assert_eq!(account.role, Role::Admin);
        assert_eq!(account.email.as_str(), "root@example.com");
    }

    #[tokio::test]
    async fn test_rejects_duplicate_and_weak_password() {
        let repos = Repositories::in_memory();
        let phone = "0788000000";
        create_with(repos.accounts.clone(), "root@example.com", "root", "password123", phone)
            .await
            .unwrap();

        let dup =
            create_with(repos.accounts.clone(), "root@example.com", "r2", "password123", phone)
                .await;
        assert!(matches!(
            dup,
            Err(CommandError::Auth(AuthError::UserAlreadyExists))
        ));

        let weak = create_with(repos.accounts, "other@example.com", "r3", "short", phone).await;
        assert!(matches!(
            weak,
            Err(CommandError::Auth(AuthError::WeakPassword(_)))
        ));
    }
}
