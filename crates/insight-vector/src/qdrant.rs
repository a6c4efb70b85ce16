//! REST implementation of the vector store contract.
//!
//! Speaks the collection/points wire protocol of a Qdrant-style store.
//! All wire types are private to this module; the rest of the engine only
//! sees domain types.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use insight_types::{ContextResult, FieldFilter, Metric, VectorPoint, VectorStoreConfig};

use crate::error::VectorStoreError;
use crate::store::VectorStore;

/// Vector store client over REST.
///
/// `connect` probes the store once; on failure the client is returned in
/// a disabled mode where every operation is a logged no-op returning
/// empty/absent. The host keeps running with vector search turned off.
pub struct QdrantStore {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    available: bool,
}

impl QdrantStore {
    /// Connect and health-probe the store.
    ///
    /// Only configuration problems error; an unreachable store yields a
    /// disabled client instead.
    pub async fn connect(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut store = Self::disconnected(config)?;

        match store.healthcheck().await {
            Ok(()) => {
                info!(url = %store.base_url, "Vector store reachable");
                store.available = true;
            }
            Err(err) => {
                warn!(
                    url = %store.base_url,
                    error = %err,
                    "Vector store unreachable; vector search disabled for this process"
                );
            }
        }

        Ok(store)
    }

    /// Build a client in disabled mode without probing.
    ///
    /// Used internally before the startup probe, and by tests that need
    /// the disabled behavior without a live store.
    pub fn disconnected(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        if config.url.is_empty() {
            return Err(VectorStoreError::Config("vector store URL is empty".into()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorStoreError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().map(SecretString::from),
            available: false,
        })
    }

    async fn healthcheck(&self) -> Result<(), VectorStoreError> {
        let url = format!("{}/healthz", self.base_url);
        let response = self.request(reqwest::Method::GET, &url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(VectorStoreError::Api {
                status: response.status().as_u16(),
                message: "health probe failed".into(),
            })
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key.expose_secret());
        }
        builder
    }

    /// Dimensionality of an existing collection, or `None` when absent.
    async fn collection_dim(&self, name: &str) -> Result<Option<usize>, VectorStoreError> {
        #[derive(Deserialize)]
        struct CollectionResponse {
            result: CollectionInfo,
        }

        #[derive(Deserialize)]
        struct CollectionInfo {
            config: CollectionConfig,
        }

        #[derive(Deserialize)]
        struct CollectionConfig {
            params: CollectionParams,
        }

        #[derive(Deserialize)]
        struct CollectionParams {
            vectors: VectorParams,
        }

        #[derive(Deserialize)]
        struct VectorParams {
            size: usize,
        }

        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self.request(reqwest::Method::GET, &url).send().await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let parsed: CollectionResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::Parse(e.to_string()))?;
        Ok(Some(parsed.result.config.params.vectors.size))
    }

    async fn create_collection(
        &self,
        name: &str,
        dim: usize,
        metric: Metric,
    ) -> Result<(), VectorStoreError> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let body = json!({
            "vectors": { "size": dim, "distance": metric.as_str() }
        });

        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            info!(collection = name, dim, metric = metric.as_str(), "Created collection");
            Ok(())
        } else {
            Err(self.api_error(response).await)
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<(), VectorStoreError> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self.request(reqwest::Method::DELETE, &url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.api_error(response).await)
        }
    }

    async fn api_error(&self, response: reqwest::Response) -> VectorStoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        VectorStoreError::Api { status, message }
    }
}

/// Render a filter into the store's `must`/`match` wire shape.
fn filter_to_json(filter: &FieldFilter) -> Value {
    let conditions: Vec<Value> = filter
        .must
        .iter()
        .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
        .collect();
    json!({ "must": conditions })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        metric: Metric,
    ) -> Result<(), VectorStoreError> {
        if !self.available {
            debug!(collection = name, "Store disabled; skipping ensure_collection");
            return Ok(());
        }

        match self.collection_dim(name).await? {
            None => self.create_collection(name, dim, metric).await,
            Some(existing) if existing == dim => Ok(()),
            Some(existing) => {
                // Schema drift: hard reset, never a silent migration.
                warn!(
                    collection = name,
                    existing, requested = dim,
                    "Collection dimensionality changed; dropping and recreating"
                );
                self.drop_collection(name).await?;
                self.create_collection(name, dim, metric).await
            }
        }
    }

    async fn upsert(&self, name: &str, points: Vec<VectorPoint>) -> Result<(), VectorStoreError> {
        if !self.available {
            debug!(collection = name, "Store disabled; dropping upsert");
            return Ok(());
        }
        if points.is_empty() {
            return Ok(());
        }

        let wire_points: Vec<Value> = points
            .iter()
            .map(|p| json!({ "id": p.id, "vector": p.vector, "payload": p.payload }))
            .collect();

        let url = format!("{}/collections/{}/points?wait=true", self.base_url, name);
        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&json!({ "points": wire_points }))
            .send()
            .await?;

        if response.status().is_success() {
            debug!(collection = name, points = points.len(), "Upserted points");
            Ok(())
        } else {
            Err(self.api_error(response).await)
        }
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<ContextResult>, VectorStoreError> {
        #[derive(Deserialize)]
        struct SearchResponse {
            result: Vec<ScoredPoint>,
        }

        #[derive(Deserialize)]
        struct ScoredPoint {
            id: Value,
            score: f32,
            #[serde(default)]
            payload: Map<String, Value>,
        }

        if !self.available {
            debug!(collection = name, "Store disabled; returning empty search");
            return Ok(Vec::new());
        }

        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true
        });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = filter_to_json(filter);
        }

        let url = format!("{}/collections/{}/points/search", self.base_url, name);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::Parse(e.to_string()))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                let content = point
                    .payload
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                ContextResult {
                    partition: name.to_string(),
                    score: point.score,
                    content,
                    id,
                    payload: point.payload,
                }
            })
            .collect())
    }

    async fn exists(&self, name: &str, ids: &[String]) -> HashSet<String> {
        #[derive(Deserialize)]
        struct RetrieveResponse {
            result: Vec<RetrievedPoint>,
        }

        #[derive(Deserialize)]
        struct RetrievedPoint {
            id: Value,
        }

        if !self.available || ids.is_empty() {
            return HashSet::new();
        }

        let url = format!("{}/collections/{}/points", self.base_url, name);
        let body = json!({
            "ids": ids,
            "with_payload": false,
            "with_vector": false
        });

        let response = match self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                // Fail open: a failed probe means "assume missing" so the
                // candidates are re-synced rather than silently dropped.
                warn!(
                    collection = name,
                    status = response.status().as_u16(),
                    "Existence probe rejected; treating batch as missing"
                );
                return HashSet::new();
            }
            Err(err) => {
                warn!(
                    collection = name,
                    error = %err,
                    "Existence probe failed; treating batch as missing"
                );
                return HashSet::new();
            }
        };

        match response.json::<RetrieveResponse>().await {
            Ok(parsed) => parsed
                .result
                .into_iter()
                .map(|point| match point.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Err(err) => {
                warn!(collection = name, error = %err, "Existence probe unparseable; treating batch as missing");
                HashSet::new()
            }
        }
    }

    async fn scroll(
        &self,
        name: &str,
        filter: Option<&FieldFilter>,
        limit: usize,
    ) -> Result<Vec<VectorPoint>, VectorStoreError> {
        #[derive(Deserialize)]
        struct ScrollResponse {
            result: ScrollResult,
        }

        #[derive(Deserialize)]
        struct ScrollResult {
            points: Vec<ScrolledPoint>,
        }

        #[derive(Deserialize)]
        struct ScrolledPoint {
            id: Value,
            #[serde(default)]
            vector: Vec<f32>,
            #[serde(default)]
            payload: Map<String, Value>,
        }

        if !self.available {
            return Ok(Vec::new());
        }

        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": true
        });
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = filter_to_json(filter);
        }

        let url = format!("{}/collections/{}/points/scroll", self.base_url, name);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let parsed: ScrollResponse = response
            .json()
            .await
            .map_err(|e| VectorStoreError::Parse(e.to_string()))?;

        Ok(parsed
            .result
            .points
            .into_iter()
            .map(|point| VectorPoint {
                id: match point.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                vector: point.vector,
                payload: point.payload,
            })
            .collect())
    }

    async fn delete_by_filter(
        &self,
        name: &str,
        filter: &FieldFilter,
    ) -> Result<(), VectorStoreError> {
        if !self.available {
            debug!(collection = name, "Store disabled; dropping delete");
            return Ok(());
        }

        let url = format!(
            "{}/collections/{}/points/delete?wait=true",
            self.base_url, name
        );
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&json!({ "filter": filter_to_json(filter) }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.api_error(response).await)
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_types::VectorStoreConfig;

    fn disabled_store() -> QdrantStore {
        QdrantStore::disconnected(&VectorStoreConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_url_is_config_error() {
        let config = VectorStoreConfig {
            url: String::new(),
            ..VectorStoreConfig::default()
        };
        assert!(matches!(
            QdrantStore::disconnected(&config),
            Err(VectorStoreError::Config(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = VectorStoreConfig {
            url: "http://localhost:6333/".into(),
            ..VectorStoreConfig::default()
        };
        let store = QdrantStore::disconnected(&config).unwrap();
        assert_eq!(store.base_url, "http://localhost:6333");
    }

    #[test]
    fn test_filter_wire_shape() {
        let filter = FieldFilter::eq("kind", "product").and("entity", "Desk");
        let rendered = filter_to_json(&filter);
        assert_eq!(
            rendered,
            json!({
                "must": [
                    { "key": "kind", "match": { "value": "product" } },
                    { "key": "entity", "match": { "value": "Desk" } }
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_disabled_store_is_noop() {
        let store = disabled_store();
        assert!(!store.is_available());

        store
            .ensure_collection("products", 3072, Metric::Cosine)
            .await
            .unwrap();
        store.upsert("products", vec![]).await.unwrap();

        let hits = store.search("products", &[0.0; 4], 5, None).await.unwrap();
        assert!(hits.is_empty());

        let present = store.exists("products", &["some-id".into()]).await;
        assert!(present.is_empty());

        let scrolled = store.scroll("products", None, 10).await.unwrap();
        assert!(scrolled.is_empty());

        store
            .delete_by_filter("products", &FieldFilter::eq("kind", "product"))
            .await
            .unwrap();
    }
}
