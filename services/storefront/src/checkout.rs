//! Checkout and order history

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::{
    cart::cart_total,
    error::{ShopError, ShopResult},
    models::{Address, Order, OrderStatus, PaymentMethod, UpdateUser, User},
    repositories::UserRepository,
    validation::validate_address,
};

fn cash_on_delivery() -> PaymentMethod {
    PaymentMethod::Cod
}

/// Checkout form
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default = "cash_on_delivery")]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub upi_id: Option<String>,
    /// Repeat submits carrying the same key return the first order
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CheckoutRequest {
    pub fn address(&self) -> Address {
        Address {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
        }
    }

    fn upi_id(&self) -> Option<&str> {
        self.upi_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Form checks; no record store access
    pub fn validate(&self) -> ShopResult<Address> {
        let address = self.address();
        validate_address(&address).map_err(ShopError::Validation)?;

        if self.payment_method == PaymentMethod::Upi && self.upi_id().is_none() {
            return Err(ShopError::Validation(
                "Please enter your UPI ID".to_string(),
            ));
        }

        Ok(address)
    }
}

/// Millisecond timestamp id, bumped past any id already used by the user
fn next_order_id(existing: &[Order], now: DateTime<Utc>) -> String {
    let mut candidate = now.timestamp_millis();
    while existing
        .iter()
        .any(|order| order.id == candidate.to_string())
    {
        candidate += 1;
    }
    candidate.to_string()
}

/// Freeze the user's cart into an order
fn build_order(
    user: &User,
    address: &Address,
    request: &CheckoutRequest,
    now: DateTime<Utc>,
) -> Order {
    Order {
        id: next_order_id(&user.orders, now),
        date: now,
        items: user.cart.clone(),
        total: cart_total(&user.cart),
        address: address.clone(),
        payment_method: request.payment_method,
        upi_id: match request.payment_method {
            PaymentMethod::Upi => request.upi_id().map(str::to_string),
            PaymentMethod::Cod => None,
        },
        status: OrderStatus::Processing,
        idempotency_key: request.idempotency_key().map(str::to_string),
    }
}

/// Order placement and history for shoppers
#[derive(Clone)]
pub struct CheckoutService {
    users: UserRepository,
}

impl CheckoutService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Turn the user's cart into an order
    ///
    /// The order append, the cart reset and the saved address go out as a
    /// single guarded write.
    pub async fn place_order(&self, user_id: &str, request: &CheckoutRequest) -> ShopResult<Order> {
        let address = request.validate()?;
        let key = request.idempotency_key();
        let mut placed: Option<Order> = None;

        let updated = self
            .users
            .modify(user_id, |user| {
                if let Some(key) = key {
                    if let Some(existing) = user
                        .orders
                        .iter()
                        .find(|order| order.idempotency_key.as_deref() == Some(key))
                    {
                        info!("Checkout replay for user {} (order {})", user_id, existing.id);
                        placed = Some(existing.clone());
                        return Ok(None);
                    }
                }

                if user.cart.is_empty() {
                    return Err(ShopError::EmptyCart);
                }

                let order = build_order(user, &address, request, Utc::now());
                let mut orders = user.orders.clone();
                orders.push(order.clone());
                placed = Some(order);

                Ok(Some(UpdateUser {
                    cart: Some(Vec::new()),
                    orders: Some(orders),
                    address: Some(address.clone()),
                    ..Default::default()
                }))
            })
            .await?;

        let order = placed.ok_or_else(|| anyhow!("checkout finished without an order"))?;
        info!(
            "User {} placed order {} ({} orders total)",
            user_id,
            order.id,
            updated.orders.len()
        );
        Ok(order)
    }

    /// Order history, read fresh from the user record
    pub async fn orders(&self, user_id: &str) -> ShopResult<Vec<Order>> {
        Ok(self.users.get(user_id).await?.orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        RecordStore,
        store::{HttpRecordStore, MemoryRecordStore, StoreConfig},
    };
    use serde_json::json;

    fn request(payment_method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            name: "Ann".to_string(),
            phone: "9876543210".to_string(),
            street: "MG Road".to_string(),
            city: "Pune".to_string(),
            pincode: "411001".to_string(),
            payment_method,
            upi_id: None,
            idempotency_key: None,
        }
    }

    fn checkout() -> (CheckoutService, RecordStore) {
        let store = RecordStore::Memory(
            MemoryRecordStore::from_value(json!({
                "users": [{
                    "id": "u1", "name": "Ann", "email": "ann@example.com", "password": "secret1",
                    "cart": [
                        {"id": "p1", "name": "Tee", "price": 499, "category": "Men", "stock": 5, "quantity": 2},
                        {"id": "p2", "name": "Cap", "price": 250.5, "category": "Women", "stock": 1}
                    ],
                    "wishlist": [],
                    "orders": []
                }]
            }))
            .unwrap(),
        );
        (CheckoutService::new(UserRepository::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_five_digit_pincode_rejected_before_any_network_call() {
        // Nothing listens here; reaching the store would be a transport error
        let unreachable = RecordStore::Http(
            HttpRecordStore::new(&StoreConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                timeout_secs: 1,
            })
            .unwrap(),
        );
        let service = CheckoutService::new(UserRepository::new(unreachable));

        let mut form = request(PaymentMethod::Cod);
        form.pincode = "41100".to_string();

        let err = service.place_order("u1", &form).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation(ref msg) if msg == "Pincode must be 6 digits"));
    }

    #[test]
    fn test_upi_requires_an_id() {
        let mut form = request(PaymentMethod::Upi);
        assert!(form.validate().is_err());

        form.upi_id = Some("   ".to_string());
        assert!(form.validate().is_err());

        form.upi_id = Some("ann@okbank".to_string());
        assert!(form.validate().is_ok());
    }

    #[tokio::test]
    async fn test_place_order_snapshots_cart_and_clears_it() {
        let (service, store) = checkout();

        let mut form = request(PaymentMethod::Upi);
        form.upi_id = Some("ann@okbank".to_string());

        let order = service.place_order("u1", &form).await.unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total, 1248.5);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.upi_id.as_deref(), Some("ann@okbank"));
        assert_eq!(order.address.pincode, "411001");

        let stored = store.get("users", "u1").await.unwrap();
        assert_eq!(stored["cart"], json!([]));
        assert_eq!(stored["orders"].as_array().unwrap().len(), 1);
        assert_eq!(stored["address"]["city"], "Pune");
        assert_eq!(stored["version"], 1);

        let history = service.orders("u1").await.unwrap();
        assert_eq!(history, vec![order]);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let (service, store) = checkout();
        store
            .patch("users", "u1", json!({"cart": []}))
            .await
            .unwrap();

        let err = service
            .place_order("u1", &request(PaymentMethod::Cod))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));
    }

    #[tokio::test]
    async fn test_idempotency_key_prevents_duplicate_orders() {
        let (service, store) = checkout();

        let mut form = request(PaymentMethod::Cod);
        form.idempotency_key = Some("submit-1".to_string());

        let first = service.place_order("u1", &form).await.unwrap();
        let replay = service.place_order("u1", &form).await.unwrap();
        assert_eq!(first, replay);

        let stored = store.get("users", "u1").await.unwrap();
        assert_eq!(stored["orders"].as_array().unwrap().len(), 1);
        assert!(first.upi_id.is_none());
    }

    #[test]
    fn test_order_ids_are_unique_per_user() {
        let now = Utc::now();
        let existing = Order {
            id: now.timestamp_millis().to_string(),
            date: now,
            items: Vec::new(),
            total: 0.0,
            address: Address::default(),
            payment_method: PaymentMethod::Cod,
            upi_id: None,
            status: OrderStatus::Processing,
            idempotency_key: None,
        };

        let next = next_order_id(std::slice::from_ref(&existing), now);
        assert_ne!(next, existing.id);
        assert_eq!(next, (now.timestamp_millis() + 1).to_string());
    }
}
