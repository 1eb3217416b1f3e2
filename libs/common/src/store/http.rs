//! HTTP record store client

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use super::{ListQuery, StoreConfig, version_of, with_version};
use crate::error::{StoreError, StoreResult};

/// Record store reached over HTTP
#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
}

impl HttpRecordStore {
    /// Build a client for the store at `config.base_url`
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(StoreError::Transport)?;

        info!("Record store client initialized with URL: {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn path(collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("/{}/{}", collection, id),
            None => format!("/{}", collection),
        }
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
        target: Option<(&str, &str)>,
    ) -> StoreResult<Response> {
        let response = request.send().await.map_err(StoreError::Transport)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            if let Some((collection, id)) = target {
                return Err(StoreError::not_found(collection, id));
            }
        }

        if !status.is_success() {
            warn!("Record store returned {} for {} {}", status, method, path);
            return Err(StoreError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    pub async fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Vec<Value>> {
        let path = Self::path(collection, None);
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&query.to_pairs());

        self.send("GET", &path, request, None)
            .await?
            .json()
            .await
            .map_err(StoreError::Transport)
    }

    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Value> {
        let path = Self::path(collection, Some(id));
        let request = self.client.get(format!("{}{}", self.base_url, path));

        self.send("GET", &path, request, Some((collection, id)))
            .await?
            .json()
            .await
            .map_err(StoreError::Transport)
    }

    pub async fn create(&self, collection: &str, document: Value) -> StoreResult<Value> {
        let path = Self::path(collection, None);
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&document);

        self.send("POST", &path, request, None)
            .await?
            .json()
            .await
            .map_err(StoreError::Transport)
    }

    pub async fn patch(&self, collection: &str, id: &str, changes: Value) -> StoreResult<Value> {
        let path = Self::path(collection, Some(id));
        let request = self
            .client
            .patch(format!("{}{}", self.base_url, path))
            .json(&changes);

        self.send("PATCH", &path, request, Some((collection, id)))
            .await?
            .json()
            .await
            .map_err(StoreError::Transport)
    }

    /// Version-checked patch
    ///
    /// The backend has no conditional update, so this is a read-compare-write:
    /// it narrows the lost-update window to the gap between the two calls
    /// instead of the whole user interaction.
    pub async fn patch_versioned(
        &self,
        collection: &str,
        id: &str,
        changes: Value,
        expected_version: u64,
    ) -> StoreResult<Value> {
        let current = self.get(collection, id).await?;
        let found = version_of(&current);

        if found != expected_version {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected: expected_version,
                found,
            });
        }

        self.patch(collection, id, with_version(changes, expected_version + 1)?)
            .await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let path = Self::path(collection, Some(id));
        let request = self.client.delete(format!("{}{}", self.base_url, path));

        self.send("DELETE", &path, request, Some((collection, id)))
            .await?;
        Ok(())
    }
}
