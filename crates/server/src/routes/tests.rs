//! Router-level tests against in-memory storage and sessions.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use techmart_core::api::RegisterRequest;
use techmart_core::{Category, MAX_QUANTITY, Price, ProductId, ProductSpecs, Role};

use crate::config::tests::test_config;
use crate::db::Repositories;
use crate::models::ProductDraft;
use crate::services::catalog::tests::FakeImageHost;
use crate::state::AppState;

struct TestApp {
    app: Router,
    state: AppState,
    repos: Repositories,
}

struct Reply {
    status: StatusCode,
    body: Value,
    cookie: Option<String>,
}

impl TestApp {
    fn new() -> Self {
        let repos = Repositories::in_memory();
        let state = AppState::new(
            test_config(),
            repos.clone(),
            Arc::new(FakeImageHost::default()),
            None,
        );
        let app = super::router(state.clone(), MemoryStore::default());
        Self { app, state, repos }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_owned);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            body,
            cookie,
        }
    }

    async fn call(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn register(&self, username: &str, email: &str) -> Reply {
        self.call(
            "POST",
            "/api/account/register",
            None,
            Some(json!({
                "username": username,
                "email": email,
                "password": "password123",
                "phoneNumber": "0788123456",
            })),
        )
        .await
    }

    /// Register and log in, returning the session cookie.
    async fn sign_in(&self, username: &str, email: &str) -> String {
        let reply = self.register(username, email).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        self.login(email).await
    }

    async fn login(&self, email: &str) -> String {
        let reply = self
            .call(
                "POST",
                "/api/account/login",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);
        reply.cookie.unwrap()
    }

    async fn sign_in_admin(&self) -> String {
        self.state
            .auth()
            .register_with_role(
                &RegisterRequest {
                    username: Some("root".to_owned()),
                    email: Some("admin@techmart.test".to_owned()),
                    password: Some("password123".to_owned()),
                    phone_number: Some("0788000000".to_owned()),
                },
                Role::Admin,
            )
            .await
            .unwrap();
        self.login("admin@techmart.test").await
    }

    async fn seed_product(&self, name: &str, price: &str) -> ProductId {
        self.repos
            .products
            .create(ProductDraft {
                name: name.to_owned(),
                description: format!("{name} description"),
                price: Price::parse(price).unwrap(),
                original_price: None,
                category: Category::Smartphones,
                brand: "Acme".to_owned(),
                image_url: "https://img.test/p.jpg".to_owned(),
                images: Vec::new(),
                quantity: 10,
                featured: false,
                specs: ProductSpecs::default(),
            })
            .await
            .unwrap()
            .id
    }
}

fn checkout_body(product: ProductId) -> Value {
    json!({
        "products": [{ "product": product, "quantity": 1, "price": 45.5 }],
        "totalAmount": 59.13,
        "shippingAddress": {
            "fullName": "Alice Uwase",
            "phone": "0788123456",
            "district": "Gasabo",
            "city": "Kigali",
        },
        "shippingMethod": "Standard",
        "paymentMethod": "Card",
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let reply = app.call("GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = app.call("GET", "/health/ready", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_dashboard() {
    let app = TestApp::new();

    let reply = app.register("alice", "alice@example.com").await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["account"]["email"], "alice@example.com");
    assert!(reply.body["account"].get("passwordHash").is_none());

    let reply = app.register("alice", "alice@example.com").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["success"], false);

    let cookie = app.login("alice@example.com").await;
    let reply = app.call("GET", "/api/dashboard", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Welcome to the dashboard");
    assert_eq!(reply.body["account"]["username"], "alice");

    let reply = app.call("GET", "/api/account/logout", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = app.call("GET", "/api/dashboard", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new();
    app.register("alice", "alice@example.com").await;

    let reply = app
        .call(
            "POST",
            "/api/account/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "User with this email does not exist");

    let reply = app
        .call(
            "POST",
            "/api/account/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Incorrect password");

    let reply = app
        .call("POST", "/api/account/login", None, Some(json!({ "email": "alice@example.com" })))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_a_json_400() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/account/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], false);
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new();
    let cookie = app.sign_in("alice", "alice@example.com").await;

    let reply = app
        .call(
            "PUT",
            "/api/account/update",
            Some(&cookie),
            Some(json!({ "username": "alice-u" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["account"]["username"], "alice-u");

    let reply = app
        .call("PUT", "/api/account/update", Some(&cookie), Some(json!({})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_writes_require_admin() {
    let app = TestApp::new();
    let id = app.seed_product("Phone", "100").await;

    let reply = app.call("DELETE", &format!("/api/products/{id}"), None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let cookie = app.sign_in("alice", "alice@example.com").await;
    let reply = app
        .call("DELETE", &format!("/api/products/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let admin = app.sign_in_admin().await;
    let reply = app
        .call("DELETE", &format!("/api/products/{id}"), Some(&admin), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Product deleted");

    let reply = app.call("GET", &format!("/api/products/{id}"), None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Product not found");
}

#[tokio::test]
async fn test_admin_creates_product_from_multipart() {
    let app = TestApp::new();
    let admin = app.sign_in_admin().await;

    let boundary = "techmart-boundary";
    let mut body = String::new();
    for (name, value) in [
        ("name", "Pixel 9"),
        ("description", "A phone"),
        ("price", "799.00"),
        ("category", "smartphones"),
        ("brand", "Google"),
        ("quantity", "4"),
        ("featured", "true"),
        ("specs", r#"{"Camera":"50MP"}"#),
    ] {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"pixel.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n--{boundary}--\r\n"
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/api/products/add")
        .header(header::COOKIE, &admin)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
    assert_eq!(reply.body["product"]["name"], "Pixel 9");
    assert_eq!(reply.body["product"]["specs"]["Camera"], "50MP");
    assert!(
        reply.body["product"]["imageUrl"]
            .as_str()
            .unwrap()
            .ends_with("pixel.jpg")
    );

    let reply = app
        .call("GET", "/api/products?category=smartphones&featured=true", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["products"].as_array().unwrap().len(), 1);

    let reply = app.call("GET", "/api/products?category=laptops", None, None).await;
    assert!(reply.body["products"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_flow() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "100").await;
    let cookie = app.sign_in("alice", "alice@example.com").await;

    let reply = app.call("GET", "/api/cart", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    for _ in 0..2 {
        let reply = app
            .call("POST", "/api/cart", Some(&cookie), Some(json!({ "productId": phone })))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
    }
    let reply = app.call("GET", "/api/cart", Some(&cookie), None).await;
    let items = reply.body["cart"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(reply.body["cart"]["itemCount"], 2);
    assert_eq!(reply.body["cart"]["subtotal"], 200.0);

    let reply = app
        .call(
            "POST",
            "/api/cart",
            Some(&cookie),
            Some(json!({ "productId": phone, "quantity": 0 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call("POST", "/api/cart", Some(&cookie), Some(json!({ "productId": 999 })))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app
        .call("DELETE", &format!("/api/cart/{phone}"), Some(&cookie), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["cart"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_quantities_are_rejected() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "1000000").await;
    let cookie = app.sign_in("alice", "alice@example.com").await;

    let reply = app
        .call(
            "POST",
            "/api/cart",
            Some(&cookie),
            Some(json!({ "productId": phone, "quantity": 3_000_000_000_i64 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "quantity is too large");
    let reply = app.call("GET", "/api/cart", Some(&cookie), None).await;
    assert!(reply.body["cart"]["items"].as_array().unwrap().is_empty());

    let mut body = checkout_body(phone);
    body["products"][0]["quantity"] = json!(300_000_000);
    let reply = app.call("POST", "/api/orders", Some(&cookie), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Invalid product line");

    let mut body = checkout_body(phone);
    body["products"][0]["quantity"] = json!(MAX_QUANTITY);
    let reply = app.call("POST", "/api/orders", Some(&cookie), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Order total is too large");
}

#[tokio::test]
async fn test_checkout_then_cancel_twice() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "45.50").await;
    let alice = app.sign_in("alice", "alice@example.com").await;

    let reply = app
        .call("POST", "/api/orders", Some(&alice), Some(checkout_body(phone)))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
    let order = &reply.body["order"];
    assert_eq!(order["orderStatus"], "pending");
    assert_eq!(order["paymentStatus"], "unpaid");
    assert_eq!(order["totalAmount"], 59.13);
    assert_eq!(order["shippingAddress"]["country"], "Rwanda");
    let id = order["id"].as_i64().unwrap();

    let reply = app.call("GET", "/api/orders", Some(&alice), None).await;
    assert_eq!(reply.body["orders"].as_array().unwrap().len(), 1);

    let uri = format!("/api/orders/{id}/cancel");
    let reply = app.call("PUT", &uri, Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["order"]["orderStatus"], "cancelled");

    let reply = app.call("PUT", &uri, Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Only pending orders can be cancelled");
}

#[tokio::test]
async fn test_pay_once() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "45.50").await;
    let alice = app.sign_in("alice", "alice@example.com").await;
    let reply = app
        .call("POST", "/api/orders", Some(&alice), Some(checkout_body(phone)))
        .await;
    let id = reply.body["order"]["id"].as_i64().unwrap();

    let uri = format!("/api/orders/{id}/pay");
    let reply = app.call("POST", &uri, Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["order"]["paymentStatus"], "paid");
    assert_eq!(reply.body["order"]["orderStatus"], "paid");

    let reply = app.call("POST", &uri, Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Order already paid");
}

#[tokio::test]
async fn test_cancelled_order_cannot_be_paid() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "45.50").await;
    let alice = app.sign_in("alice", "alice@example.com").await;
    let reply = app
        .call("POST", "/api/orders", Some(&alice), Some(checkout_body(phone)))
        .await;
    let id = reply.body["order"]["id"].as_i64().unwrap();

    let reply = app
        .call("PUT", &format!("/api/orders/{id}/cancel"), Some(&alice), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = app
        .call("POST", &format!("/api/orders/{id}/pay"), Some(&alice), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Only pending orders can be paid");

    let reply = app
        .call("GET", &format!("/api/orders/{id}"), Some(&alice), None)
        .await;
    assert_eq!(reply.body["order"]["orderStatus"], "cancelled");
    assert_eq!(reply.body["order"]["paymentStatus"], "unpaid");
}

#[tokio::test]
async fn test_order_validation_messages() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "45.50").await;
    let alice = app.sign_in("alice", "alice@example.com").await;

    let cases = [
        ("products", json!([]), "Products are required"),
        ("totalAmount", json!("59.13"), "totalAmount (number) is required"),
        ("totalAmount", json!(0), "totalAmount (number) is required"),
        ("shippingAddress", json!({ "fullName": "A" }), "Complete shippingAddress is required"),
        ("paymentMethod", Value::Null, "paymentMethod is required"),
        ("paymentMethod", json!("Barter"), "Unsupported paymentMethod"),
    ];
    for (field, value, message) in cases {
        let mut body = checkout_body(phone);
        body[field] = value;
        let reply = app.call("POST", "/api/orders", Some(&alice), Some(body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{field}");
        assert_eq!(reply.body["message"], message, "{field}");
    }

    let reply = app
        .call("POST", "/api/orders", Some(&alice), Some(checkout_body(ProductId::new(404))))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Unknown product: 404");
}

#[tokio::test]
async fn test_order_access_control() {
    let app = TestApp::new();
    let phone = app.seed_product("Phone", "45.50").await;
    let alice = app.sign_in("alice", "alice@example.com").await;
    let bob = app.sign_in("bob", "bob@example.com").await;
    let admin = app.sign_in_admin().await;

    let reply = app
        .call("POST", "/api/orders", Some(&alice), Some(checkout_body(phone)))
        .await;
    let id = reply.body["order"]["id"].as_i64().unwrap();
    let uri = format!("/api/orders/{id}");

    assert_eq!(app.call("GET", &uri, Some(&alice), None).await.status, StatusCode::OK);
    assert_eq!(app.call("GET", &uri, Some(&admin), None).await.status, StatusCode::OK);
    let reply = app.call("GET", &uri, Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["message"], "Not authorized");

    let reply = app.call("GET", "/api/orders/abc", Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Invalid order id");

    let reply = app.call("GET", "/api/orders/9999", Some(&alice), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app.call("GET", "/api/orders/all", Some(&bob), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let reply = app.call("GET", "/api/orders/all", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    let reply = app.call("GET", "/api/nothing-here", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["success"], false);
}
