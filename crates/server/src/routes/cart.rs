//! Cart route handlers.
//!
//! The server cart belongs to the signed-in account. Anonymous carts live
//! only on the client and are merged in after login.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use techmart_core::ProductId;
use techmart_core::api::{CartAdjustRequest, CartResponse};

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::services::cart::CartError;
use crate::state::AppState;

/// `GET /api/cart`
#[instrument(skip_all, fields(account_id = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().view(current.id).await?;
    Ok(Json(CartResponse {
        success: true,
        message: None,
        cart,
    }))
}

/// `POST /api/cart {productId, quantity}`: apply a signed quantity change.
#[instrument(skip_all, fields(account_id = %current.id, product_id = %request.product_id, delta = request.quantity))]
pub async fn adjust(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiJson(request): ApiJson<CartAdjustRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state.carts().adjust(current.id, request).await?;
    Ok(Json(CartResponse {
        success: true,
        message: Some("Cart updated".to_owned()),
        cart,
    }))
}

/// `DELETE /api/cart/{productId}`
#[instrument(skip_all, fields(account_id = %current.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>> {
    let product_id: ProductId = product_id
        .parse()
        .map_err(|_| AppError::Cart(CartError::NotInCart))?;
    let cart = state.carts().remove(current.id, product_id).await?;
    Ok(Json(CartResponse {
        success: true,
        message: Some("Item removed from cart".to_owned()),
        cart,
    }))
}
