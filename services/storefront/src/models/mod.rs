//! Storefront models
//!
//! Documents as they are stored in the record store, plus the request
//! payloads the HTTP API accepts.

pub mod order;
pub mod product;
pub mod user;

// Re-export for convenience
pub use order::{CartItem, CustomerOrder, Order, OrderStatus, PaymentMethod};
pub use product::{Category, NewProduct, Product, UpdateProduct};
pub use user::{Address, LoginCredentials, RegisterRequest, Role, UpdateUser, User, UserProfile};

use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

/// Ids are strings in new documents but numbers in some seeded ones
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {}",
            other
        ))),
    }
}

/// Older orders store `""` instead of omitting optional text fields
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
