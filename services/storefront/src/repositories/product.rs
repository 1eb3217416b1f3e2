//! Product repository for record store operations

use common::{ListQuery, RecordStore, StoreResult};
use tracing::info;

use crate::models::{NewProduct, Product, UpdateProduct};

pub const PRODUCTS: &str = "products";

/// Product repository
#[derive(Clone)]
pub struct ProductRepository {
    store: RecordStore,
}

impl ProductRepository {
    /// Create a new product repository
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Get products, optionally paged
    pub async fn get_all(&self, query: &ListQuery) -> StoreResult<Vec<Product>> {
        self.store.list_as(PRODUCTS, query).await
    }

    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        self.store.find_as(PRODUCTS, id).await
    }

    pub async fn create(&self, product: &NewProduct) -> StoreResult<Product> {
        info!("Creating product: {}", product.name);
        self.store.create_as(PRODUCTS, product).await
    }

    pub async fn update(&self, id: &str, changes: &UpdateProduct) -> StoreResult<Product> {
        info!("Updating product: {}", id);
        self.store.patch_as(PRODUCTS, id, changes).await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        info!("Deleting product: {}", id);
        self.store.delete(PRODUCTS, id).await
    }
}
