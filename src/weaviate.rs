//! Thin REST driver for Weaviate.
//!
//! All persistence, indexing and search is Weaviate's job; this client only
//! shapes requests against its HTTP API: object CRUD, batch import, schema
//! management, GraphQL (BM25 + aggregation) and the health/meta probes.

use crate::errors::{MemoryBankError, Result};
use crate::model::{ChunkProperties, COLLECTION};
use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use std::time::Duration;

/// Properties requested back from GraphQL queries.
const QUERY_FIELDS: &str = "content filepath filename directory section_title last_modified \
     file_size_kb content_type tags image_data image_format url url_title url_description \
     is_mcp binary_hash binary_type binary_notes binary_size";

#[derive(Clone)]
pub struct WeaviateClient {
    http: reqwest::Client,
    base_url: String,
}

impl WeaviateClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("WEAVIATE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn v1(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    /// True when the readiness probe answers 200.
    pub async fn is_ready(&self) -> bool {
        match self.http.get(self.v1(".well-known/ready")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("Weaviate readiness probe failed: {e}");
                false
            }
        }
    }

    pub async fn meta(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.v1("meta"))
            .send()
            .await
            .context("Failed to reach Weaviate /v1/meta")?;
        resp.json().await.context("Failed to parse meta response")
    }

    pub async fn server_version(&self) -> Result<String> {
        let meta = self.meta().await?;
        Ok(meta
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    pub async fn nodes(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.v1("nodes"))
            .send()
            .await
            .context("Failed to reach Weaviate /v1/nodes")?;
        resp.json().await.context("Failed to parse nodes response")
    }

    /// First `lines` lines of Weaviate's Prometheus metrics, for the
    /// dashboard. The full dump is large and not ours to interpret.
    pub async fn metrics_head(&self, lines: usize) -> Result<String> {
        let resp = self
            .http
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .context("Failed to reach Weaviate /metrics")?;
        let text = resp.text().await.context("Failed to read metrics body")?;
        Ok(text
            .lines()
            .take(lines)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    // ---- schema ----

    pub async fn schema_exists(&self) -> Result<bool> {
        let resp = self
            .http
            .get(self.v1(&format!("schema/{COLLECTION}")))
            .send()
            .await
            .context("Failed to reach Weaviate schema endpoint")?;
        Ok(resp.status().is_success())
    }

    /// Create the `MarkdownChunk` class when it is missing. The collection is
    /// created with vectorizer "none"; vectors are always supplied explicitly.
    pub async fn ensure_schema(&self) -> Result<()> {
        if self.schema_exists().await? {
            return Ok(());
        }
        tracing::info!("Creating {COLLECTION} collection");
        let class = json!({
            "class": COLLECTION,
            "description": "Content chunks of all kinds: text, images, URLs and binary files",
            "vectorizer": "none",
            "properties": [
                {"name": "content", "dataType": ["text"], "description": "The textual content or description"},
                {"name": "filepath", "dataType": ["text"], "description": "Full original file path", "indexFilterable": true},
                {"name": "filename", "dataType": ["text"], "description": "Name of the file", "indexFilterable": true},
                {"name": "directory", "dataType": ["text"], "description": "The directory path", "indexFilterable": true},
                {"name": "section_title", "dataType": ["text"], "description": "Title of the section", "indexFilterable": true, "indexSearchable": true},
                {"name": "last_modified", "dataType": ["date"], "description": "Last modification timestamp", "indexFilterable": true},
                {"name": "file_size_kb", "dataType": ["number"], "description": "Size of the file in KB", "indexFilterable": true},
                {"name": "content_type", "dataType": ["text"], "description": "Kind of content (text, image, url, binary)", "indexFilterable": true},
                {"name": "tags", "dataType": ["text"], "description": "Free-form tags", "indexFilterable": true, "indexSearchable": true},
                {"name": "image_data", "dataType": ["blob"], "description": "Base64 encoded image data"},
                {"name": "image_format", "dataType": ["text"], "description": "Image format (jpg, png, ...)", "indexFilterable": true},
                {"name": "url", "dataType": ["text"], "description": "The URL", "indexFilterable": true, "indexSearchable": true},
                {"name": "url_title", "dataType": ["text"], "description": "Title of the webpage", "indexSearchable": true},
                {"name": "url_description", "dataType": ["text"], "description": "Description of the webpage", "indexSearchable": true},
                {"name": "is_mcp", "dataType": ["boolean"], "description": "Whether the URL is a management-console service", "indexFilterable": true},
                {"name": "binary_hash", "dataType": ["text"], "description": "MD5 hash of the binary file", "indexFilterable": true},
                {"name": "binary_type", "dataType": ["text"], "description": "Kind of binary file", "indexFilterable": true},
                {"name": "binary_notes", "dataType": ["text"], "description": "Notes about the binary file", "indexSearchable": true},
                {"name": "binary_size", "dataType": ["number"], "description": "Size of the binary file in bytes", "indexFilterable": true}
            ]
        });
        let resp = self
            .http
            .post(self.v1("schema"))
            .json(&class)
            .send()
            .await
            .context("Failed to create schema")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "schema creation returned {status}: {body}"
            ))));
        }
        Ok(())
    }

    // ---- object CRUD ----

    /// Insert one object with an explicit vector, returning the UUID that
    /// Weaviate issues for it.
    pub async fn insert_object(&self, properties: &ChunkProperties, vector: &[f32]) -> Result<String> {
        let body = json!({
            "class": COLLECTION,
            "properties": properties,
            "vector": vector,
        });
        let resp = self
            .http
            .post(self.v1("objects"))
            .json(&body)
            .send()
            .await
            .context("Failed to insert object")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "insert returned {status}: {text}"
            ))));
        }
        let created: Value = resp.json().await.context("Failed to parse insert response")?;
        created
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!(MemoryBankError::Weaviate("insert response had no id".into())))
    }

    /// Batch import. Used for multi-chunk text adds; one round trip instead
    /// of one per chunk.
    pub async fn insert_batch(&self, objects: &[(ChunkProperties, Vec<f32>)]) -> Result<Vec<String>> {
        let payload = json!({
            "objects": objects
                .iter()
                .map(|(props, vector)| json!({
                    "class": COLLECTION,
                    "properties": props,
                    "vector": vector,
                }))
                .collect::<Vec<_>>(),
        });
        let resp = self
            .http
            .post(self.v1("batch/objects"))
            .json(&payload)
            .send()
            .await
            .context("Failed to batch insert objects")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "batch insert returned {status}: {text}"
            ))));
        }
        let results: Value = resp.json().await.context("Failed to parse batch response")?;
        let mut ids = Vec::new();
        if let Some(items) = results.as_array() {
            for item in items {
                let failed = item
                    .pointer("/result/errors")
                    .map(|e| !e.is_null())
                    .unwrap_or(false);
                if failed {
                    tracing::warn!("Batch object failed: {item}");
                    continue;
                }
                if let Some(id) = item.get("id").and_then(|v| v.as_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        if ids.is_empty() {
            return Err(anyhow!(MemoryBankError::Weaviate(
                "batch insert stored no objects".into()
            )));
        }
        Ok(ids)
    }

    /// Fetch one object including its vector. `Ok(None)` when the UUID is
    /// unknown.
    pub async fn get_object(&self, id: &str) -> Result<Option<Value>> {
        let resp = self
            .http
            .get(self.v1(&format!("objects/{COLLECTION}/{id}?include=vector")))
            .send()
            .await
            .context("Failed to fetch object")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "get returned {status}: {text}"
            ))));
        }
        let object = resp.json().await.context("Failed to parse object")?;
        Ok(Some(object))
    }

    /// Merge-patch an object's properties, optionally replacing its vector.
    pub async fn patch_object(
        &self,
        id: &str,
        properties: Value,
        vector: Option<&[f32]>,
    ) -> Result<()> {
        let mut body = json!({
            "class": COLLECTION,
            "id": id,
            "properties": properties,
        });
        if let Some(vector) = vector {
            body["vector"] = json!(vector);
        }
        let resp = self
            .http
            .patch(self.v1(&format!("objects/{COLLECTION}/{id}")))
            .json(&body)
            .send()
            .await
            .context("Failed to patch object")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!(MemoryBankError::NotFound(id.to_string())));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "patch returned {status}: {text}"
            ))));
        }
        Ok(())
    }

    pub async fn delete_object(&self, id: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.v1(&format!("objects/{COLLECTION}/{id}")))
            .send()
            .await
            .context("Failed to delete object")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!(MemoryBankError::NotFound(id.to_string())));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "delete returned {status}: {text}"
            ))));
        }
        Ok(())
    }

    // ---- GraphQL ----

    async fn graphql(&self, query: String) -> Result<Value> {
        let resp = self
            .http
            .post(self.v1("graphql"))
            .json(&json!({"query": query}))
            .send()
            .await
            .context("Failed to reach Weaviate GraphQL endpoint")?;
        let body: Value = resp.json().await.context("Failed to parse GraphQL response")?;
        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            return Err(anyhow!(MemoryBankError::Weaviate(format!(
                "GraphQL errors: {errors}"
            ))));
        }
        Ok(body)
    }

    /// BM25 keyword search, optionally restricted to one content kind.
    pub async fn bm25_search(
        &self,
        query: &str,
        limit: usize,
        content_type: Option<&str>,
    ) -> Result<Vec<Value>> {
        let escaped = serde_json::to_string(query).context("Failed to escape query")?;
        let filter = match content_type {
            Some(kind) => {
                let kind = serde_json::to_string(kind).context("Failed to escape filter")?;
                format!(
                    r#", where: {{path: ["content_type"], operator: Equal, valueText: {kind}}}"#
                )
            }
            None => String::new(),
        };
        let gql = format!(
            "{{ Get {{ {COLLECTION}(bm25: {{query: {escaped}}}, limit: {limit}{filter}) \
             {{ {QUERY_FIELDS} _additional {{ id }} }} }} }}"
        );
        let body = self.graphql(gql).await?;
        Ok(body
            .pointer(&format!("/data/Get/{COLLECTION}"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Total object count in the collection.
    pub async fn count_objects(&self) -> Result<u64> {
        let gql = format!("{{ Aggregate {{ {COLLECTION} {{ meta {{ count }} }} }} }}");
        let body = self.graphql(gql).await?;
        body.pointer(&format!("/data/Aggregate/{COLLECTION}/0/meta/count"))
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                anyhow!(MemoryBankError::Weaviate(
                    "aggregate response had no count".into()
                ))
            })
    }

    /// Recent entries with id and vector, for the dashboard listing.
    pub async fn list_objects(&self, limit: usize) -> Result<Vec<Value>> {
        let gql = format!(
            "{{ Get {{ {COLLECTION}(limit: {limit}) \
             {{ filename content_type _additional {{ id vector }} }} }} }}"
        );
        let body = self.graphql(gql).await?;
        Ok(body
            .pointer(&format!("/data/Get/{COLLECTION}"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }
}
