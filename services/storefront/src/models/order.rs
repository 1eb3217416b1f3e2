//! Cart line and order models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Address, Product, blank_as_none, string_or_number};

fn one() -> u32 {
    1
}

/// Product snapshot plus a quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default = "one")]
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    Upi,
}

/// Order fulfilment status
///
/// The usual progression is Processing → Shipped → Delivered, but admins may
/// set any value at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    fn stage(self) -> u8 {
        match self {
            OrderStatus::Processing => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::Delivered => 2,
        }
    }

    /// Whether moving to `next` goes backwards in the fulfilment flow
    pub fn is_regression_to(self, next: OrderStatus) -> bool {
        next.stage() < self.stage()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        };
        f.write_str(label)
    }
}

/// Order snapshot, frozen at checkout except for `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub date: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub total: f64,
    #[serde(default)]
    pub address: Address,
    #[serde(rename = "paymentMethod")]
    pub payment_method: PaymentMethod,
    #[serde(
        rename = "upiId",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub upi_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(
        rename = "idempotencyKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub idempotency_key: Option<String>,
}

/// An order tagged with the customer it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrder {
    #[serde(flatten)]
    pub order: Order,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
}
