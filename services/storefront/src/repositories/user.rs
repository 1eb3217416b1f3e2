//! User repository for record store operations

use common::{ListQuery, RecordStore, StoreError, StoreResult};
use tracing::{info, warn};

use crate::models::{UpdateUser, User};

pub const USERS: &str = "users";

/// How many times a conflicting write is re-applied to a fresh read
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    store: RecordStore,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        info!("Finding user by email: {}", email);

        let users: Vec<User> = self
            .store
            .list_as(USERS, &ListQuery::new().filter("email", email))
            .await?;
        Ok(users.into_iter().next())
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        self.store.find_as(USERS, id).await
    }

    /// Get a user by ID, failing when it does not exist
    pub async fn get(&self, id: &str) -> StoreResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found(USERS, id))
    }

    /// Get all users
    pub async fn get_all(&self) -> StoreResult<Vec<User>> {
        self.store.list_as(USERS, &ListQuery::new()).await
    }

    /// Create a new user
    pub async fn create(&self, user: &User) -> StoreResult<User> {
        info!("Creating new user: {}", user.email);
        self.store.create_as(USERS, user).await
    }

    /// Read-modify-write guarded by the user's version
    ///
    /// `change` sees the freshly read record and returns the fields to write,
    /// or `None` when there is nothing to do. When another writer got in
    /// between, the record is read again and `change` re-applied, up to
    /// [`MAX_WRITE_ATTEMPTS`] times.
    pub async fn modify<F, E>(&self, id: &str, mut change: F) -> Result<User, E>
    where
        F: FnMut(&User) -> Result<Option<UpdateUser>, E>,
        E: From<StoreError>,
    {
        let mut attempt = 1;

        loop {
            let user = self.get(id).await?;

            let Some(changes) = change(&user)? else {
                return Ok(user);
            };

            match self
                .store
                .patch_versioned_as(USERS, id, &changes, user.version)
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(StoreError::Conflict { found, .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    warn!(
                        "User {} changed concurrently (now version {}), retrying write {}/{}",
                        id,
                        found,
                        attempt + 1,
                        MAX_WRITE_ATTEMPTS
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete a user
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        info!("Deleting user: {}", id);
        self.store.delete(USERS, id).await
    }
}
