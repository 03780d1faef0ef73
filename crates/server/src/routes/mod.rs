//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (database)
//!
//! # Account
//! POST   /api/account/register        - Create a local account
//! POST   /api/account/login           - Password login (sets session cookie)
//! GET    /api/account/logout          - Clear the session
//! PUT    /api/account/update          - Partial profile update
//! GET    /api/dashboard               - Profile probe for the signed-in account
//!
//! # Products (writes require admin)
//! GET    /api/products                - List (?category=&featured=)
//! GET    /api/products/{id}           - Detail
//! POST   /api/products/add            - Create (multipart)
//! PUT    /api/products/{id}           - Update (multipart)
//! DELETE /api/products/{id}           - Delete
//!
//! # Cart (requires auth)
//! GET    /api/cart                    - Current cart
//! POST   /api/cart                    - Apply a signed quantity change
//! DELETE /api/cart/{productId}        - Remove a line
//!
//! # Orders (requires auth)
//! POST   /api/orders                  - Place an order
//! GET    /api/orders                  - Caller's orders
//! GET    /api/orders/all              - Every order (admin)
//! GET    /api/orders/{id}             - Detail (owner or admin)
//! PUT    /api/orders/{id}/cancel      - Cancel a pending order
//! POST   /api/orders/{id}/pay         - Mark as paid
//! ```

pub mod account;
pub mod cart;
pub mod orders;
pub mod products;

#[cfg(test)]
mod tests;

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use techmart_core::api::ApiMessage;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, with_sessions,
};
use crate::state::AppState;

/// Largest accepted product form (primary image plus three more).
const PRODUCT_FORM_LIMIT: usize = 20 * 1024 * 1024;

/// Create the account routes router.
pub fn account_routes(rate_limit: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(account::register))
        .route("/login", post(account::login));
    let credentials = if rate_limit {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    Router::new()
        .merge(credentials)
        .route("/logout", get(account::logout))
        .route("/update", put(account::update))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/add", post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::adjust))
        .route("/{product_id}", axum::routing::delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::mine).post(orders::create))
        .route("/all", get(orders::all))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", put(orders::cancel))
        .route("/{id}/pay", post(orders::pay))
}

/// Create all `/api` routes.
pub fn api_routes(rate_limit: bool) -> Router<AppState> {
    let shop = Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes());
    let shop = if rate_limit {
        shop.layer(api_rate_limiter())
    } else {
        shop
    };

    Router::new()
        .nest("/account", account_routes(rate_limit))
        .route("/dashboard", get(account::dashboard))
        .merge(shop)
}

fn cors_layer(frontend_url: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(error = %e, frontend_url, "Invalid frontend URL; CORS disabled");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
    )
}

/// Build the complete application: routes, sessions, CORS, tracing and
/// Sentry layers.
pub fn router<Store>(state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let config = state.config().clone();

    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(config.rate_limit))
        .fallback(not_found)
        .with_state(state);

    let app = with_sessions(app, session_store, &config);
    let app = match cors_layer(&config.frontend_url) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn not_found() -> (StatusCode, Json<ApiMessage>) {
    (StatusCode::NOT_FOUND, Json(ApiMessage::error("Route not found")))
}
