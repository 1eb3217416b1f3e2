//! Storefront service
//!
//! Session, cart and wishlist, route guards, catalog, checkout and admin
//! management layered over a generic REST record store, served as a JSON API.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod guards;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use error::{ShopError, ShopResult};
pub use routes::create_router;
pub use state::AppState;
