//! Custom error types for the common library
//!
//! This module defines the errors raised while talking to the record store,
//! the generic document backend every service reads and writes through.

use thiserror::Error;

/// Custom error type for record store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never produced a response (connection refused, timeout, ...)
    #[error("Record store transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Record store returned {status} for {method} {path}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    /// No document with the given id exists in the collection
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The document changed since it was read
    #[error("{collection}/{id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        collection: String,
        id: String,
        expected: u64,
        found: u64,
    },

    /// A document could not be converted to or from its typed form
    #[error("Record decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error
    #[error("Record store configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
