//! Order route handlers.
//!
//! Placing, listing and reading orders, plus the two status transitions
//! available to the owner: cancel and pay.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use techmart_core::CheckoutRequest;
use techmart_core::api::{OrderResponse, OrdersResponse};

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::orders::parse_order_id;
use crate::state::AppState;

/// `POST /api/orders`
#[instrument(skip_all, fields(account_id = %current.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let order = state.orders().place(current.id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            message: Some("Order created successfully".to_owned()),
            order,
        }),
    ))
}

/// `GET /api/orders`: the caller's orders, newest first.
#[instrument(skip_all, fields(account_id = %current.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<OrdersResponse>> {
    let orders = state.orders().list_mine(current.id).await?;
    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// `GET /api/orders/all`: every order (admin).
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn all(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<OrdersResponse>> {
    let orders = state.orders().list_all().await?;
    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// `GET /api/orders/{id}`
#[instrument(skip_all, fields(account_id = %current.id, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders()
        .get(parse_order_id(&id)?, current.id, current.role)
        .await?;
    Ok(Json(OrderResponse {
        success: true,
        message: None,
        order,
    }))
}

/// `PUT /api/orders/{id}/cancel`
#[instrument(skip_all, fields(account_id = %current.id, order_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>> {
    let order = state.orders().cancel(parse_order_id(&id)?, current.id).await?;
    Ok(Json(OrderResponse {
        success: true,
        message: Some("Order cancelled successfully".to_owned()),
        order,
    }))
}

/// `POST /api/orders/{id}/pay`
#[instrument(skip_all, fields(account_id = %current.id, order_id = %id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>> {
    let order = state.orders().pay(parse_order_id(&id)?, current.id).await?;
    Ok(Json(OrderResponse {
        success: true,
        message: Some("Order marked as paid".to_owned()),
        order,
    }))
}
