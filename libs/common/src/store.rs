//! Record store client
//!
//! The record store is a generic REST document backend: every collection
//! (`users`, `products`, ...) is a list of JSON documents addressed by id and
//! manipulated through whole-document CRUD plus shallow `PATCH` merges.
//! [`RecordStore`] speaks to it over HTTP, or keeps the documents in process
//! for development and tests.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::env;

use crate::error::{StoreError, StoreResult};

pub mod http;
pub mod memory;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;

/// Document field carrying the optimistic-concurrency token
pub const VERSION_FIELD: &str = "version";

/// Configuration for the record store connection
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the record store (e.g., "http://localhost:3000")
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl StoreConfig {
    /// Create a new StoreConfig from environment variables
    ///
    /// # Environment Variables
    /// - `RECORD_STORE_URL`: Record store base URL (default: "http://localhost:3000")
    /// - `RECORD_STORE_TIMEOUT_SECS`: Request timeout in seconds (default: 10)
    pub fn from_env() -> StoreResult<Self> {
        let base_url =
            env::var("RECORD_STORE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::Configuration(format!(
                "Invalid record store URL: {}",
                base_url
            )));
        }

        let timeout_secs = env::var("RECORD_STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }
}

/// Filtering and paging for collection reads
///
/// Maps onto the store's query string: plain `field=value` equality filters
/// plus `_start` and `_limit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    filters: Vec<(String, String)>,
    start: Option<usize>,
    limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only documents whose `field` equals `value`
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Skip the first `start` documents
    pub fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    /// Return at most `limit` documents
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    pub fn start_offset(&self) -> usize {
        self.start.unwrap_or(0)
    }

    pub fn max_items(&self) -> Option<usize> {
        self.limit
    }

    /// Query string pairs in the order the store expects them
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if let Some(start) = self.start {
            pairs.push(("_start".to_string(), start.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("_limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Handle on the record store
#[derive(Clone)]
pub enum RecordStore {
    /// Remote store reached over HTTP
    Http(HttpRecordStore),
    /// In-process store
    Memory(MemoryRecordStore),
}

impl RecordStore {
    /// Connect to the remote store described by `config`
    pub fn http(config: &StoreConfig) -> StoreResult<Self> {
        Ok(RecordStore::Http(HttpRecordStore::new(config)?))
    }

    /// Read the documents of a collection
    pub async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Value>> {
        match self {
            RecordStore::Http(store) => store.list(collection, query).await,
            RecordStore::Memory(store) => store.list(collection, query).await,
        }
    }

    /// Read one document by id
    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Value> {
        match self {
            RecordStore::Http(store) => store.get(collection, id).await,
            RecordStore::Memory(store) => store.get(collection, id).await,
        }
    }

    /// Insert a new document and return it as stored
    pub async fn create(&self, collection: &str, document: Value) -> StoreResult<Value> {
        match self {
            RecordStore::Http(store) => store.create(collection, document).await,
            RecordStore::Memory(store) => store.create(collection, document).await,
        }
    }

    /// Shallow-merge `changes` into a document
    pub async fn patch(&self, collection: &str, id: &str, changes: Value) -> StoreResult<Value> {
        match self {
            RecordStore::Http(store) => store.patch(collection, id, changes).await,
            RecordStore::Memory(store) => store.patch(collection, id, changes).await,
        }
    }

    /// Shallow-merge `changes` into a document still at `expected_version`
    ///
    /// The stored version is bumped by one. A document whose version moved
    /// on since it was read yields [`StoreError::Conflict`].
    pub async fn patch_versioned(
        &self,
        collection: &str,
        id: &str,
        changes: Value,
        expected_version: u64,
    ) -> StoreResult<Value> {
        match self {
            RecordStore::Http(store) => {
                store
                    .patch_versioned(collection, id, changes, expected_version)
                    .await
            }
            RecordStore::Memory(store) => {
                store
                    .patch_versioned(collection, id, changes, expected_version)
                    .await
            }
        }
    }

    /// Remove a document
    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        match self {
            RecordStore::Http(store) => store.delete(collection, id).await,
            RecordStore::Memory(store) => store.delete(collection, id).await,
        }
    }

    pub async fn list_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> StoreResult<Vec<T>> {
        self.list(collection, query)
            .await?
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(StoreError::from))
            .collect()
    }

    /// Typed read where a missing document is `None` rather than an error
    pub async fn find_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<T>> {
        match self.get(collection, id).await {
            Ok(document) => Ok(Some(serde_json::from_value(document)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_as<T: DeserializeOwned, B: Serialize>(
        &self,
        collection: &str,
        document: &B,
    ) -> StoreResult<T> {
        let created = self
            .create(collection, serde_json::to_value(document)?)
            .await?;
        Ok(serde_json::from_value(created)?)
    }

    pub async fn patch_as<T: DeserializeOwned, B: Serialize>(
        &self,
        collection: &str,
        id: &str,
        changes: &B,
    ) -> StoreResult<T> {
        let patched = self
            .patch(collection, id, serde_json::to_value(changes)?)
            .await?;
        Ok(serde_json::from_value(patched)?)
    }

    pub async fn patch_versioned_as<T: DeserializeOwned, B: Serialize>(
        &self,
        collection: &str,
        id: &str,
        changes: &B,
        expected_version: u64,
    ) -> StoreResult<T> {
        let patched = self
            .patch_versioned(
                collection,
                id,
                serde_json::to_value(changes)?,
                expected_version,
            )
            .await?;
        Ok(serde_json::from_value(patched)?)
    }
}

/// Version token of a document; documents written before versioning read as 0
pub fn version_of(document: &Value) -> u64 {
    document
        .get(VERSION_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Id of a document as a string, whether stored as a string or a number
pub fn id_of(document: &Value) -> Option<String> {
    match document.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Add the next version token to a patch body
pub(crate) fn with_version(changes: Value, version: u64) -> StoreResult<Value> {
    let mut fields = into_object(changes)?;
    fields.insert(VERSION_FIELD.to_string(), Value::from(version));
    Ok(Value::Object(fields))
}

pub(crate) fn into_object(value: Value) -> StoreResult<Map<String, Value>> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Configuration(format!(
            "Expected a JSON object document, got {}",
            other
        ))),
    }
}
