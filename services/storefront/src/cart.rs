//! Cart and wishlist
//!
//! The line-level rules live in plain functions over slices/vectors; the
//! [`CartStore`] wraps them in version-guarded writes to the user record.

use serde::Serialize;
use tracing::info;

use crate::{
    error::{ShopError, ShopResult},
    models::{CartItem, Product, UpdateUser},
    repositories::{ProductRepository, UserRepository},
};

/// Upper bound on the units of one product in a cart
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Add one unit of `product`: bump an existing line or append a new one
///
/// Returns `false`, leaving the cart untouched, when the line is already at
/// [`MAX_LINE_QUANTITY`].
pub fn add_item(cart: &mut Vec<CartItem>, product: &Product) -> bool {
    match cart.iter_mut().find(|item| item.product.id == product.id) {
        Some(item) if item.quantity >= MAX_LINE_QUANTITY => false,
        Some(item) => {
            item.quantity += 1;
            true
        }
        None => {
            cart.push(CartItem::new(product.clone()));
            true
        }
    }
}

/// Drop the line for `product_id`; returns whether a line was removed
pub fn remove_item(cart: &mut Vec<CartItem>, product_id: &str) -> bool {
    let before = cart.len();
    cart.retain(|item| item.product.id != product_id);
    cart.len() != before
}

/// Set a line's quantity; anything below 1 removes the line
///
/// Quantities above [`MAX_LINE_QUANTITY`] are clamped to it. Returns whether
/// the cart changed.
pub fn set_quantity(cart: &mut Vec<CartItem>, product_id: &str, quantity: i64) -> bool {
    if quantity < 1 {
        return remove_item(cart, product_id);
    }

    let quantity = u32::try_from(quantity)
        .unwrap_or(MAX_LINE_QUANTITY)
        .min(MAX_LINE_QUANTITY);
    match cart.iter_mut().find(|item| item.product.id == product_id) {
        Some(item) if item.quantity != quantity => {
            item.quantity = quantity;
            true
        }
        _ => false,
    }
}

/// Number of units across all lines
pub fn cart_count(cart: &[CartItem]) -> u64 {
    cart.iter().map(|item| u64::from(item.quantity)).sum()
}

/// Σ price × quantity
pub fn cart_total(cart: &[CartItem]) -> f64 {
    cart.iter().map(CartItem::line_total).sum()
}

/// Add to the wishlist unless already present; returns whether it was added
pub fn add_to_wishlist(wishlist: &mut Vec<Product>, product: &Product) -> bool {
    if wishlist.iter().any(|item| item.id == product.id) {
        return false;
    }
    wishlist.push(product.clone());
    true
}

pub fn remove_from_wishlist(wishlist: &mut Vec<Product>, product_id: &str) -> bool {
    let before = wishlist.len();
    wishlist.retain(|item| item.id != product_id);
    wishlist.len() != before
}

/// Cart contents plus its derived figures
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub count: u64,
    pub total: f64,
}

impl CartSummary {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self {
            count: cart_count(&items),
            total: cart_total(&items),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistSummary {
    pub items: Vec<Product>,
    pub count: usize,
}

impl WishlistSummary {
    pub fn from_items(items: Vec<Product>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// Cart and wishlist operations for one user at a time
#[derive(Clone)]
pub struct CartStore {
    users: UserRepository,
    products: ProductRepository,
}

impl CartStore {
    pub fn new(users: UserRepository, products: ProductRepository) -> Self {
        Self { users, products }
    }

    async fn product(&self, product_id: &str) -> ShopResult<Product> {
        self.products
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Product {}", product_id)))
    }

    pub async fn cart(&self, user_id: &str) -> ShopResult<CartSummary> {
        let user = self.users.get(user_id).await?;
        Ok(CartSummary::from_items(user.cart))
    }

    pub async fn add_to_cart(&self, user_id: &str, product_id: &str) -> ShopResult<CartSummary> {
        let product = self.product(product_id).await?;
        if !product.in_stock() {
            return Err(ShopError::OutOfStock(product.name));
        }

        let user = self
            .users
            .modify(user_id, |user| {
                let mut cart = user.cart.clone();
                if !add_item(&mut cart, &product) {
                    return Err(ShopError::Validation(format!(
                        "At most {} of {} per order",
                        MAX_LINE_QUANTITY, product.name
                    )));
                }
                Ok(Some(UpdateUser::cart(cart)))
            })
            .await?;

        info!("User {} added product {} to cart", user_id, product_id);
        Ok(CartSummary::from_items(user.cart))
    }

    pub async fn remove_from_cart(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> ShopResult<CartSummary> {
        let user = self
            .users
            .modify(user_id, |user| {
                let mut cart = user.cart.clone();
                let changed = remove_item(&mut cart, product_id);
                Ok::<_, ShopError>(changed.then(|| UpdateUser::cart(cart)))
            })
            .await?;

        Ok(CartSummary::from_items(user.cart))
    }

    pub async fn update_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ShopResult<CartSummary> {
        if quantity > i64::from(MAX_LINE_QUANTITY) {
            return Err(ShopError::Validation(format!(
                "Quantity must be at most {}",
                MAX_LINE_QUANTITY
            )));
        }

        let user = self
            .users
            .modify(user_id, |user| {
                if !user.cart.iter().any(|item| item.product.id == product_id) {
                    return Err(ShopError::NotFound(format!("Cart line {}", product_id)));
                }
                let mut cart = user.cart.clone();
                let changed = set_quantity(&mut cart, product_id, quantity);
                Ok(changed.then(|| UpdateUser::cart(cart)))
            })
            .await?;

        Ok(CartSummary::from_items(user.cart))
    }

    pub async fn clear_cart(&self, user_id: &str) -> ShopResult<CartSummary> {
        let user = self
            .users
            .modify(user_id, |user| {
                Ok::<_, ShopError>((!user.cart.is_empty()).then(|| UpdateUser::cart(Vec::new())))
            })
            .await?;

        Ok(CartSummary::from_items(user.cart))
    }

    pub async fn wishlist(&self, user_id: &str) -> ShopResult<WishlistSummary> {
        let user = self.users.get(user_id).await?;
        Ok(WishlistSummary::from_items(user.wishlist))
    }

    pub async fn add_to_wishlist(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> ShopResult<WishlistSummary> {
        let product = self.product(product_id).await?;

        let user = self
            .users
            .modify(user_id, |user| {
                let mut wishlist = user.wishlist.clone();
                let added = add_to_wishlist(&mut wishlist, &product);
                Ok::<_, ShopError>(added.then(|| UpdateUser::wishlist(wishlist)))
            })
            .await?;

        Ok(WishlistSummary::from_items(user.wishlist))
    }

    pub async fn remove_from_wishlist(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> ShopResult<WishlistSummary> {
        let user = self
            .users
            .modify(user_id, |user| {
                let mut wishlist = user.wishlist.clone();
                let removed = remove_from_wishlist(&mut wishlist, product_id);
                Ok::<_, ShopError>(removed.then(|| UpdateUser::wishlist(wishlist)))
            })
            .await?;

        Ok(WishlistSummary::from_items(user.wishlist))
    }
}
