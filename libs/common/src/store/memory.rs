//! In-process record store
//!
//! Mirrors the HTTP store's semantics (equality filters, `_start`/`_limit`
//! paging, shallow merges) over documents held in memory. Version-checked
//! patches are atomic here since the check and the write share one lock.

use serde_json::Value;
use std::{collections::HashMap, path::Path, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{ListQuery, id_of, into_object, version_of, with_version};
use crate::error::{StoreError, StoreResult};

type Collections = HashMap<String, Vec<Value>>;

/// Record store kept in process memory
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a database document shaped `{"users": [...], "products": [...]}`
    pub fn from_value(seed: Value) -> StoreResult<Self> {
        let mut collections = Collections::new();

        for (name, documents) in into_object(seed)? {
            match documents {
                Value::Array(documents) => {
                    collections.insert(name, documents);
                }
                other => {
                    return Err(StoreError::Configuration(format!(
                        "Collection {} must be an array, got {}",
                        name, other
                    )));
                }
            }
        }

        Ok(Self {
            collections: Arc::new(RwLock::new(collections)),
        })
    }

    /// Seed from a JSON database file
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let store = Self::from_value(serde_json::from_str(&raw)?)?;
        info!("In-process record store seeded from {}", path.display());
        Ok(store)
    }

    pub async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let matching = documents
            .iter()
            .filter(|document| {
                query
                    .filters()
                    .iter()
                    .all(|(field, expected)| field_matches(document, field, expected))
            })
            .skip(query.start_offset());

        Ok(match query.max_items() {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }

    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Value> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|documents| find(documents, id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    pub async fn create(&self, collection: &str, document: Value) -> StoreResult<Value> {
        let mut fields = into_object(document)?;
        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                let id = Uuid::new_v4().simple().to_string();
                fields.insert("id".to_string(), Value::from(id.clone()));
                id
            }
        };
        let document = Value::Object(fields);

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if find(documents, &id).is_some() {
            return Err(StoreError::Status {
                method: "POST",
                path: format!("/{}", collection),
                status: 409,
            });
        }

        documents.push(document.clone());
        Ok(document)
    }

    pub async fn patch(&self, collection: &str, id: &str, changes: Value) -> StoreResult<Value> {
        let changes = into_object(changes)?;
        let mut collections = self.collections.write().await;
        let document = find_mut(&mut collections, collection, id)?;

        merge(document, changes)?;
        Ok(document.clone())
    }

    pub async fn patch_versioned(
        &self,
        collection: &str,
        id: &str,
        changes: Value,
        expected_version: u64,
    ) -> StoreResult<Value> {
        let changes = into_object(with_version(changes, expected_version + 1)?)?;
        let mut collections = self.collections.write().await;
        let document = find_mut(&mut collections, collection, id)?;

        let found = version_of(document);
        if found != expected_version {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected: expected_version,
                found,
            });
        }

        merge(document, changes)?;
        Ok(document.clone())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let position = documents
            .iter()
            .position(|document| id_of(document).as_deref() == Some(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        documents.remove(position);
        Ok(())
    }
}

fn find<'a>(documents: &'a [Value], id: &str) -> Option<&'a Value> {
    documents
        .iter()
        .find(|document| id_of(document).as_deref() == Some(id))
}

fn find_mut<'a>(
    collections: &'a mut Collections,
    collection: &str,
    id: &str,
) -> StoreResult<&'a mut Value> {
    collections
        .get_mut(collection)
        .and_then(|documents| {
            documents
                .iter_mut()
                .find(|document| id_of(document).as_deref() == Some(id))
        })
        .ok_or_else(|| StoreError::not_found(collection, id))
}

fn field_matches(document: &Value, field: &str, expected: &str) -> bool {
    match document.get(field) {
        Some(Value::String(value)) => value == expected,
        Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string() == expected,
        _ => false,
    }
}

fn merge(document: &mut Value, changes: serde_json::Map<String, Value>) -> StoreResult<()> {
    let Value::Object(fields) = document else {
        return Err(StoreError::Configuration(
            "Stored document is not a JSON object".to_string(),
        ));
    };

    for (key, value) in changes {
        fields.insert(key, value);
    }
    Ok(())
}
