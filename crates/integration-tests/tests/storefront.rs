//! End-to-end storefront flows over real HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;

use techmart_client::{CartStore, ClientError, MemoryStorage, ProductUpload};
use techmart_core::api::ProductQuery;
use techmart_core::{
    Category, CheckoutLine, CheckoutRequest, OrderStatus, PaymentMethod, PaymentStatus, Price,
    Product, ProductSpecs, ShippingAddress, ShippingMethod,
};
use techmart_integration_tests::TestServer;

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Alice Uwase".to_owned(),
        phone: "0788123456".to_owned(),
        country: "Rwanda".to_owned(),
        district: "Gasabo".to_owned(),
        city: "Kigali".to_owned(),
    }
}

fn checkout(product: &Product, quantity: i64, total: Decimal) -> CheckoutRequest {
    CheckoutRequest::new(
        vec![CheckoutLine {
            product: product.id,
            quantity,
            price: Some(product.price.amount()),
        }],
        total,
        address(),
        ShippingMethod::Standard,
        PaymentMethod::MobileMoney,
    )
}

fn api_error(result: Result<impl std::fmt::Debug, ClientError>) -> (u16, String) {
    match result {
        Err(ClientError::Api { status, message }) => (status, message),
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await.unwrap();
    assert!(server.client().unwrap().health().await.unwrap());
}

#[tokio::test]
async fn test_session_lifecycle() {
    let server = TestServer::start().await.unwrap();
    let alice = server.shopper("alice").await.unwrap();

    let me = alice.dashboard().await.unwrap();
    assert_eq!(me.username, "alice");
    assert_eq!(me.email.as_str(), "alice@example.com");

    alice.logout().await.unwrap();
    let err = alice.dashboard().await.unwrap_err();
    assert!(err.is_unauthorized());

    let (status, message) = api_error(alice.login("alice@example.com", "wrong-password").await);
    assert_eq!(status, 401);
    assert_eq!(message, "Incorrect password");
}

#[tokio::test]
async fn test_checkout_then_cancel_twice() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "45.50").await.unwrap();
    let alice = server.shopper("alice").await.unwrap();

    let order = alice
        .create_order(&checkout(&phone, 1, Decimal::new(5913, 2)))
        .await
        .unwrap();
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    assert_eq!(order.subtotal, Decimal::new(4550, 2));
    assert_eq!(order.shipping_cost, Decimal::new(999, 2));
    assert_eq!(order.tax, Decimal::new(364, 2));
    assert_eq!(order.total_amount, Decimal::new(5913, 2));
    assert_eq!(order.shipping_address.country, "Rwanda");

    let mine = alice.my_orders().await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, order.id);

    let cancelled = alice.cancel_order(order.id).await.unwrap();
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);

    let (status, message) = api_error(alice.cancel_order(order.id).await);
    assert_eq!(status, 400);
    assert_eq!(message, "Only pending orders can be cancelled");
}

#[tokio::test]
async fn test_pay_once() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "45.50").await.unwrap();
    let alice = server.shopper("alice").await.unwrap();
    let order = alice
        .create_order(&checkout(&phone, 1, Decimal::new(5913, 2)))
        .await
        .unwrap();

    let paid = alice.pay_order(order.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.order_status, OrderStatus::Paid);

    let (status, message) = api_error(alice.pay_order(order.id).await);
    assert_eq!(status, 400);
    assert_eq!(message, "Order already paid");
}

#[tokio::test]
async fn test_client_total_is_not_trusted() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "45.50").await.unwrap();
    let alice = server.shopper("alice").await.unwrap();

    let order = alice
        .create_order(&checkout(&phone, 2, Decimal::new(1, 2)))
        .await
        .unwrap();
    // 91.00 + 9.99 shipping + 7.28 tax
    assert_eq!(order.total_amount, Decimal::new(10827, 2));
}

#[tokio::test]
async fn test_order_visibility() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "45.50").await.unwrap();
    let alice = server.shopper("alice").await.unwrap();
    let bob = server.shopper("bob").await.unwrap();
    let admin = server.admin().await.unwrap();

    let order = alice
        .create_order(&checkout(&phone, 1, Decimal::new(5913, 2)))
        .await
        .unwrap();

    let (status, _) = api_error(bob.order(order.id).await);
    assert_eq!(status, 403);
    assert_eq!(admin.order(order.id).await.unwrap().id, order.id);

    let (status, _) = api_error(bob.all_orders().await);
    assert_eq!(status, 403);
    assert_eq!(admin.all_orders().await.unwrap().len(), 1);

    let (status, _) = api_error(bob.cancel_order(order.id).await);
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_add_twice_is_one_line() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "100").await.unwrap();
    let alice = server.shopper("alice").await.unwrap();

    alice.adjust_cart(phone.id, 1).await.unwrap();
    let cart = alice.adjust_cart(phone.id, 1).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.quantity_of(phone.id), 2);
    assert_eq!(cart.subtotal, Decimal::new(200, 0));

    let cart = alice.adjust_cart(phone.id, -2).await.unwrap();
    assert!(cart.items.is_empty());

    let (status, _) = api_error(alice.adjust_cart(phone.id, 0).await);
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_merge_on_login() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "100").await.unwrap();
    let case = server.seed_product("Case", "15").await.unwrap();
    let charger = server.seed_product("Charger", "25").await.unwrap();
    let cable = server.seed_product("Cable", "5").await.unwrap();

    // Server cart from an earlier session: phone x1, cable x5.
    let earlier = server.shopper("alice").await.unwrap();
    earlier.adjust_cart(phone.id, 1).await.unwrap();
    earlier.adjust_cart(cable.id, 5).await.unwrap();

    // Signed-out shopping: phone x3, case x1, cable x2, charger x1.
    let mut local = CartStore::load(MemoryStorage::new());
    local.add(phone.summary(), 3).await;
    local.add(case.summary(), 1).await;
    local.add(cable.summary(), 2).await;
    local.add(charger.summary(), 1).await;

    // The charger disappears before sign-in.
    server.delete_product(&charger).await.unwrap();

    let client = server.client().unwrap();
    client.login("alice@example.com", "password123").await.unwrap();
    let report = local.merge_on_login(client.clone()).await;

    assert_eq!(report.applied, 2);
    assert_eq!(report.failed, 1);
    assert!(report.replaced);

    let server_cart = client.cart().await.unwrap();
    assert_eq!(server_cart.quantity_of(phone.id), 3);
    assert_eq!(server_cart.quantity_of(case.id), 1);
    assert_eq!(server_cart.quantity_of(cable.id), 5);
    assert_eq!(server_cart.quantity_of(charger.id), 0);

    assert_eq!(local.items(), server_cart.items.as_slice());
    assert_eq!(local.item_count(), 9);

    // Later changes are mirrored.
    local.set_quantity(cable.id, 1).await;
    assert_eq!(client.cart().await.unwrap().quantity_of(cable.id), 1);
    local.remove(case.id).await;
    assert_eq!(client.cart().await.unwrap().quantity_of(case.id), 0);
}

#[tokio::test]
async fn test_merge_without_session_keeps_local_cart() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "100").await.unwrap();

    let mut local = CartStore::load(MemoryStorage::new());
    local.add(phone.summary(), 2).await;

    let report = local.merge_on_login(server.client().unwrap()).await;
    assert!(!report.replaced);
    assert_eq!(local.quantity_of(phone.id), 2);
}

#[tokio::test]
async fn test_catalog_reads_and_admin_writes() {
    let server = TestServer::start().await.unwrap();
    let phone = server.seed_product("Phone", "100").await.unwrap();
    let client = server.client().unwrap();

    let all = client.products(&ProductQuery::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    let laptops = client
        .products(&ProductQuery {
            category: Some(Category::Laptops),
            featured: None,
        })
        .await
        .unwrap();
    assert!(laptops.is_empty());
    assert_eq!(client.product(phone.id).await.unwrap().name, "Phone");

    let alice = server.shopper("alice").await.unwrap();
    let (status, _) = api_error(alice.delete_product(phone.id).await);
    assert_eq!(status, 403);

    // No image host is configured in the harness.
    let admin = server.admin().await.unwrap();
    let upload = ProductUpload {
        name: "Tablet".to_owned(),
        description: "A tablet".to_owned(),
        price: Price::parse("300").unwrap(),
        original_price: None,
        quantity: 3,
        category: Category::Tablets,
        brand: "Acme".to_owned(),
        featured: false,
        specs: ProductSpecs::default(),
        image: Some(techmart_client::ImageFile {
            file_name: "tablet.jpg".to_owned(),
            content_type: "image/jpeg".to_owned(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }),
        additional_images: Vec::new(),
        existing_image: None,
        existing_additional_images: Vec::new(),
    };
    let (status, _) = api_error(admin.create_product(upload).await);
    assert_eq!(status, 503);

    admin.delete_product(phone.id).await.unwrap();
    let (status, message) = api_error(client.product(phone.id).await);
    assert_eq!(status, 404);
    assert_eq!(message, "Product not found");
}
