//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartItem, Order, Product, string_or_number};

/// Closed set of roles; authorization decisions go through `guards::authorize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// Shipping address, also frozen into every order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub pincode: String,
}

/// User document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string, or plaintext for records created before hashing
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "isBlock", default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default)]
    pub wishlist: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u64,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_blocked: self.is_blocked,
            address: self.address.clone(),
            created_at: self.created_at,
        }
    }
}

/// What a session carries about its user
///
/// Deliberately omits the password and the cart/wishlist/orders arrays; those
/// are always read fresh from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isBlock")]
    pub is_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial user update; only the fields that are set are written
#[derive(Debug, Clone, Serialize, Default)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart: Option<Vec<CartItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wishlist: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "isBlock", skip_serializing_if = "Option::is_none")]
    pub is_blocked: Option<bool>,
}

impl UpdateUser {
    pub fn cart(cart: Vec<CartItem>) -> Self {
        Self {
            cart: Some(cart),
            ..Default::default()
        }
    }

    pub fn wishlist(wishlist: Vec<Product>) -> Self {
        Self {
            wishlist: Some(wishlist),
            ..Default::default()
        }
    }

    pub fn orders(orders: Vec<Order>) -> Self {
        Self {
            orders: Some(orders),
            ..Default::default()
        }
    }

    pub fn blocked(is_blocked: bool) -> Self {
        Self {
            is_blocked: Some(is_blocked),
            ..Default::default()
        }
    }
}

/// User login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Request for user registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}
