//! Account route handlers.
//!
//! Registration, password login, logout and profile updates. Successful
//! logins store a [`CurrentAccount`] in the session.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use techmart_core::api::{
    AccountResponse, ApiMessage, DashboardResponse, LoginRequest, RegisterRequest,
    UpdateAccountRequest,
};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_account, set_current_account};
use crate::models::{CurrentAccount, session_keys};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// `POST /api/account/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let account = state.auth().register(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            success: true,
            message: Some("User account created successfully.".to_owned()),
            account: account.view(),
        }),
    ))
}

/// `POST /api/account/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AccountResponse>> {
    let account = state.auth().login(&request).await?;

    set_current_account(&session, &CurrentAccount::from(&account)).await?;
    set_sentry_user(&account.id, Some(account.email.as_str()));

    Ok(Json(AccountResponse {
        success: true,
        message: Some("user logged in successfully".to_owned()),
        account: account.view(),
    }))
}

/// `GET /api/account/logout`
#[instrument(skip_all)]
pub async fn logout(
    OptionalAuth(account): OptionalAuth,
    session: Session,
) -> Result<Json<ApiMessage>> {
    clear_current_account(&session).await?;
    if let Some(account) = account {
        tracing::info!(account_id = %account.id, "Logged out");
    }
    clear_sentry_user();
    Ok(Json(ApiMessage::ok("Logged out successfully")))
}

/// `PUT /api/account/update`
#[instrument(skip_all, fields(account_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>> {
    let account = state.auth().update_profile(current.id, &request).await?;

    // Keep the session identity in step with a changed email.
    let refreshed = CurrentAccount::from(&account);
    if refreshed != current {
        session
            .insert(session_keys::CURRENT_ACCOUNT, &refreshed)
            .await?;
    }

    Ok(Json(AccountResponse {
        success: true,
        message: Some("Account updated successfully".to_owned()),
        account: account.view(),
    }))
}

/// `GET /api/dashboard`: profile probe for the signed-in account.
#[instrument(skip_all, fields(account_id = %current.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<DashboardResponse>> {
    // A session can outlive its account.
    let account = state.auth().account(current.id).await.map_err(|err| match err {
        AuthError::UserNotFound => AppError::Unauthorized("Not authenticated".to_owned()),
        other => other.into(),
    })?;
    Ok(Json(DashboardResponse {
        success: true,
        message: "Welcome to the dashboard".to_owned(),
        account: account.view(),
    }))
}
