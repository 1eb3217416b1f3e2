//! Common library for the storefront
//!
//! This crate provides the infrastructure shared by the storefront services:
//! the record store client, the session cache and their error types.

pub mod cache;
pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{ListQuery, RecordStore};

/// Example usage of the record store
///
/// ```rust,no_run
/// use common::store::{ListQuery, RecordStore, StoreConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StoreConfig::from_env()?;
///     let store = RecordStore::http(&config)?;
///     let featured = store.list("products", &ListQuery::new().limit(4)).await?;
///     println!("Featured products: {}", featured.len());
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
