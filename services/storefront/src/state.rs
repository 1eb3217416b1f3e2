//! Application state shared across handlers

use common::{RecordStore, cache::SessionCache};

use crate::{
    admin::AdminService,
    cart::CartStore,
    catalog::CatalogService,
    checkout::CheckoutService,
    repositories::{ProductRepository, UserRepository},
    session::SessionStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub carts: CartStore,
    pub catalog: CatalogService,
    pub checkout: CheckoutService,
    pub admin: AdminService,
    pub cache: SessionCache,
}

impl AppState {
    /// Wire every service onto one record store and one session cache
    pub fn new(store: RecordStore, cache: SessionCache, session_ttl_seconds: u64) -> Self {
        let users = UserRepository::new(store.clone());
        let products = ProductRepository::new(store);

        Self {
            sessions: SessionStore::new(users.clone(), cache.clone(), session_ttl_seconds),
            carts: CartStore::new(users.clone(), products.clone()),
            catalog: CatalogService::new(products.clone()),
            checkout: CheckoutService::new(users.clone()),
            admin: AdminService::new(users, products),
            cache,
        }
    }
}
