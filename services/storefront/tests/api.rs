//! End-to-end tests for the storefront HTTP API
//!
//! Each test starts the real router on an ephemeral port, backed by the
//! in-process record store and session cache, and drives it over TCP.

use common::{
    RecordStore,
    cache::{MemoryCache, SessionCache},
    store::MemoryRecordStore,
};
use reqwest::{Client, StatusCode, header::LOCATION, redirect::Policy};
use serde_json::{Value, json};
use storefront::{AppState, create_router, error::BLOCKED_NOTICE};
use tokio::net::TcpListener;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct TestServer {
    base: String,
    client: Client,
    store: RecordStore,
    cache: MemoryCache,
}

impl TestServer {
    async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let store = RecordStore::Memory(MemoryRecordStore::from_value(seed())?);
        let cache = MemoryCache::new();
        let state = AppState::new(store.clone(), SessionCache::Memory(cache.clone()), 3600);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.ok();
        });

        Ok(Self {
            base: format!("http://{}", address),
            client: Client::builder().redirect(Policy::none()).build()?,
            store,
            cache,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn login(&self, email: &str, password: &str) -> Result<String, Box<dyn std::error::Error>> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {}", email);

        let body: Value = response.json().await?;
        Ok(body["token"].as_str().unwrap_or_default().to_string())
    }
}

fn seed() -> Value {
    json!({
        "users": [
            {
                "id": "1", "name": "Ann", "email": "ann@example.com", "password": "secret1",
                "role": "User", "isBlock": false, "cart": [], "wishlist": [], "orders": []
            },
            {
                "id": "2", "name": "Bob", "email": "bob@example.com", "password": "secret2",
                "role": "User", "isBlock": true, "cart": [], "wishlist": [], "orders": []
            },
            {
                "id": "9", "name": "Root", "email": "admin@example.com", "password": "admin123",
                "role": "Admin", "isBlock": false, "cart": [], "wishlist": [], "orders": []
            }
        ],
        "products": [
            {"id": 1, "name": "Iron Man T-Shirt", "price": 499, "category": "Men", "stock": 10, "image": "tee.png"},
            {"id": 2, "name": "Marvel Hoodie", "price": 1499, "category": "Men", "stock": 4, "image": "hoodie.png"},
            {"id": 3, "name": "Floral Dress", "price": 2499, "category": "Women", "stock": 0, "image": "dress.png"},
            {"id": 4, "name": "Denim Jacket", "price": 3999, "category": "Women", "stock": 2, "image": "jacket.png"},
            {"id": 5, "name": "Summer Tee", "price": 799, "category": "Women", "stock": 7, "image": "summer.png"}
        ]
    })
}

fn address_form() -> Value {
    json!({
        "name": "Ann",
        "phone": "9876543210",
        "street": "MG Road",
        "city": "Pune",
        "pincode": "411001",
        "payment_method": "COD"
    })
}

#[tokio::test]
async fn test_wrong_password_persists_no_session() -> TestResult {
    let server = TestServer::start().await?;

    let response = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({"email": "ann@example.com", "password": "wrong"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Invalid credentials");
    assert_eq!(server.cache.len().await, 0);

    let response = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({"email": "nobody@example.com", "password": "secret1"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.cache.len().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_register_then_login_and_logout() -> TestResult {
    let server = TestServer::start().await?;

    let response = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({"name": "Cara", "email": "cara@example.com", "password": "hunter22"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({"name": "Cara", "email": "cara@example.com", "password": "hunter22"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let token = server.login("cara@example.com", "hunter22").await?;
    let me: Value = server
        .client
        .get(server.url("/me"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(me["email"], "cara@example.com");
    assert!(me.get("password").is_none());

    let response = server
        .client
        .post(server.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client
        .get(server.url("/me"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_route_guards() -> TestResult {
    let server = TestServer::start().await?;

    // No session on a protected route
    let response = server.client.get(server.url("/cart")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Signed-in user visiting a public-only route goes home
    let user = server.login("ann@example.com", "secret1").await?;
    let response = server
        .client
        .post(server.url("/auth/login"))
        .bearer_auth(&user)
        .json(&json!({"email": "ann@example.com", "password": "secret1"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/");

    // Shoppers are kept out of the back office
    let response = server
        .client
        .get(server.url("/admin/dashboard"))
        .bearer_auth(&user)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admins are kept out of shopper routes
    let admin = server.login("admin@example.com", "admin123").await?;
    let response = server
        .client
        .get(server.url("/cart"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .get(server.url("/admin/dashboard"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_blocked_users_cannot_reach_protected_routes() -> TestResult {
    let server = TestServer::start().await?;

    // Already blocked: login is refused
    let response = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({"email": "bob@example.com", "password": "secret2"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "User is blocked");
    assert_eq!(server.cache.len().await, 0);

    // Blocked mid-session: shut out on the very next request
    let user = server.login("ann@example.com", "secret1").await?;
    let admin = server.login("admin@example.com", "admin123").await?;

    let response = server
        .client
        .patch(server.url("/admin/users/1/block"))
        .bearer_auth(&admin)
        .json(&json!({"blocked": true}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    for path in ["/cart", "/wishlist", "/orders", "/me"] {
        let response = server
            .client
            .get(server.url(path))
            .bearer_auth(&user)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", path);
        let body: Value = response.json().await?;
        assert_eq!(body["error"], BLOCKED_NOTICE);
    }

    // A blocked admin loses the back office too
    server
        .store
        .patch("users", "9", json!({"isBlock": true}))
        .await?;
    let response = server
        .client
        .get(server.url("/admin/users"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], BLOCKED_NOTICE);

    Ok(())
}

#[tokio::test]
async fn test_block_toggle_rejects_malformed_bodies() -> TestResult {
    let server = TestServer::start().await?;
    let admin = server.login("admin@example.com", "admin123").await?;

    let response = server
        .client
        .patch(server.url("/admin/users/2/block"))
        .bearer_auth(&admin)
        .json(&json!({"blocked": "true"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.store.get("users", "2").await?["isBlock"], true);

    // No body flips the flag
    let response = server
        .client
        .patch(server.url("/admin/users/2/block"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.store.get("users", "2").await?["isBlock"], false);

    // So does an empty object
    let response = server
        .client
        .patch(server.url("/admin/users/2/block"))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.store.get("users", "2").await?["isBlock"], true);

    Ok(())
}

#[tokio::test]
async fn test_cart_quantities() -> TestResult {
    let server = TestServer::start().await?;
    let user = server.login("ann@example.com", "secret1").await?;

    for _ in 0..2 {
        let response = server
            .client
            .post(server.url("/cart/items"))
            .bearer_auth(&user)
            .json(&json!({"product_id": 1}))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let cart: Value = server
        .client
        .get(server.url("/cart"))
        .bearer_auth(&user)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["count"], 2);
    assert_eq!(cart["total"], 998.0);

    // Out of stock
    let response = server
        .client
        .post(server.url("/cart/items"))
        .bearer_auth(&user)
        .json(&json!({"product_id": "3"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Oversized quantities are refused and leave the line alone
    let response = server
        .client
        .patch(server.url("/cart/items/1"))
        .bearer_auth(&user)
        .json(&json!({"quantity": 4294967295u64}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let stored = server.store.get("users", "1").await?;
    assert_eq!(stored["cart"][0]["quantity"], 2);

    // Dropping to zero removes the line
    let cart: Value = server
        .client
        .patch(server.url("/cart/items/1"))
        .bearer_auth(&user)
        .json(&json!({"quantity": 0}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["count"], 0);

    Ok(())
}

#[tokio::test]
async fn test_wishlist_has_no_duplicates() -> TestResult {
    let server = TestServer::start().await?;
    let user = server.login("ann@example.com", "secret1").await?;

    for _ in 0..2 {
        server
            .client
            .post(server.url("/wishlist/items"))
            .bearer_auth(&user)
            .json(&json!({"product_id": "4"}))
            .send()
            .await?;
    }

    let wishlist: Value = server
        .client
        .get(server.url("/wishlist"))
        .bearer_auth(&user)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(wishlist["count"], 1);

    let wishlist: Value = server
        .client
        .delete(server.url("/wishlist/items/4"))
        .bearer_auth(&user)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(wishlist["count"], 0);

    Ok(())
}

#[tokio::test]
async fn test_checkout_validation_and_idempotency() -> TestResult {
    let server = TestServer::start().await?;
    let user = server.login("ann@example.com", "secret1").await?;

    // Nothing in the cart yet
    let response = server
        .client
        .post(server.url("/checkout"))
        .bearer_auth(&user)
        .json(&address_form())
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server
        .client
        .post(server.url("/cart/items"))
        .bearer_auth(&user)
        .json(&json!({"product_id": "2"}))
        .send()
        .await?;

    let mut form = address_form();
    form["pincode"] = json!("41100");
    let response = server
        .client
        .post(server.url("/checkout"))
        .bearer_auth(&user)
        .json(&form)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Pincode must be 6 digits");

    let mut form = address_form();
    form["idempotency_key"] = json!("submit-42");
    let first = server
        .client
        .post(server.url("/checkout"))
        .bearer_auth(&user)
        .json(&form)
        .send()
        .await?;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first: Value = first.json().await?;
    assert_eq!(first["total"], 1499.0);
    assert_eq!(first["status"], "Processing");
    assert_eq!(first["paymentMethod"], "COD");

    let replay: Value = server
        .client
        .post(server.url("/checkout"))
        .bearer_auth(&user)
        .json(&form)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(replay["id"], first["id"]);

    let orders: Value = server
        .client
        .get(server.url("/orders"))
        .bearer_auth(&user)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(orders.as_array().map(Vec::len), Some(1));

    let cart: Value = server
        .client
        .get(server.url("/cart"))
        .bearer_auth(&user)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(cart["count"], 0);

    Ok(())
}

#[tokio::test]
async fn test_admin_status_change_reaches_order_history() -> TestResult {
    let server = TestServer::start().await?;
    let user = server.login("ann@example.com", "secret1").await?;
    let admin = server.login("admin@example.com", "admin123").await?;

    server
        .client
        .post(server.url("/cart/items"))
        .bearer_auth(&user)
        .json(&json!({"product_id": "5"}))
        .send()
        .await?;
    let order: Value = server
        .client
        .post(server.url("/checkout"))
        .bearer_auth(&user)
        .json(&address_form())
        .send()
        .await?
        .json()
        .await?;
    let order_id = order["id"].as_str().unwrap_or_default().to_string();

    let response = server
        .client
        .patch(server.url(&format!("/admin/users/1/orders/{}/status", order_id)))
        .bearer_auth(&admin)
        .json(&json!({"status": "Delivered"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Same session, no re-login
    let orders: Value = server
        .client
        .get(server.url("/orders"))
        .bearer_auth(&user)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(orders[0]["status"], "Delivered");
    assert_eq!(orders[0]["total"], 799.0);

    let all: Value = server
        .client
        .get(server.url("/admin/orders"))
        .bearer_auth(&admin)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(all[0]["userEmail"], "ann@example.com");

    let report: Value = server
        .client
        .get(server.url("/admin/reports"))
        .bearer_auth(&admin)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(report["total_orders"], 1);
    assert_eq!(report["status"]["delivered"], 1);
    assert_eq!(report["revenue_by_payment"]["cod"], 799.0);

    Ok(())
}

#[tokio::test]
async fn test_admin_deletes_need_confirmation() -> TestResult {
    let server = TestServer::start().await?;
    let admin = server.login("admin@example.com", "admin123").await?;

    let response = server
        .client
        .delete(server.url("/admin/products/4"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .delete(server.url("/admin/products/4?confirm=true"))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client
        .get(server.url("/products/4"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_catalog_filters_and_strips() -> TestResult {
    let server = TestServer::start().await?;

    let page: Value = server
        .client
        .get(server.url("/products"))
        .query(&[("category", "Women"), ("price", "0-999,3000+")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(page["total"], 2);
    assert_eq!(page["sections"][1]["category"], "Women");
    assert_eq!(page["sections"][0]["products"], json!([]));

    let page: Value = server
        .client
        .get(server.url("/products?search=HOODIE"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(page["total"], 1);
    assert_eq!(page["products"][0]["id"], "2");

    let response = server
        .client
        .get(server.url("/products?category=Kids"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let featured: Value = server
        .client
        .get(server.url("/products/featured"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(featured.as_array().map(Vec::len), Some(4));

    let arrivals: Value = server
        .client
        .get(server.url("/products/new-arrivals"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(arrivals.as_array().map(Vec::len), Some(1));
    assert_eq!(arrivals[0]["id"], "5");

    Ok(())
}
