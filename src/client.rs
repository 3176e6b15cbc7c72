//! HTTP client for the REST gateway, used by the CLI subcommands.
//!
//! Every call returns the server's JSON body; rendering for the terminal
//! lives in the `print_*` helpers so the call sites stay testable.

use crate::config::Settings;
use crate::errors::Result;
use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use std::path::Path;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.api_url, &settings.api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn parse(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let text = resp.text().await.context("Failed to read response body")?;
        if !status.is_success() {
            return Err(anyhow!("API returned {status}: {text}"));
        }
        serde_json::from_str(&text).context("Failed to parse API response")
    }

    pub async fn health(&self) -> Result<Value> {
        let resp = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .context("Failed to reach Memory Bank API")?;
        Self::parse(resp).await
    }

    pub async fn query(&self, text: &str, limit: usize, content_type: &str) -> Result<Value> {
        let mut payload = json!({"query": text, "limit": limit});
        if content_type != "all" {
            payload["content_type"] = json!(content_type);
        }
        let resp = self
            .http
            .post(self.url("/query"))
            .header("X-API-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to query Memory Bank")?;
        Self::parse(resp).await
    }

    pub async fn add_text(
        &self,
        content: &str,
        filename: Option<&str>,
        directory: Option<&str>,
        title: Option<&str>,
    ) -> Result<Value> {
        let mut payload = json!({"content": content, "content_type": "text"});
        if let Some(filename) = filename {
            payload["filename"] = json!(filename);
        }
        if let Some(directory) = directory {
            payload["directory"] = json!(directory);
        }
        if let Some(title) = title {
            payload["section_title"] = json!(title);
        }
        self.post_add(payload).await
    }

    pub async fn add_image(&self, path: &str, title: Option<&str>) -> Result<Value> {
        if !Path::new(path).exists() {
            return Err(anyhow!("Image file not found: {path}"));
        }
        let name = file_name(path);
        let payload = json!({
            "content": path,
            "content_type": "image",
            "filename": name,
            "directory": parent_dir(path),
            "section_title": title.map(|t| t.to_string()).unwrap_or_else(|| format!("Image: {name}")),
        });
        self.post_add(payload).await
    }

    pub async fn add_url(&self, url: &str, title: Option<&str>) -> Result<Value> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("Invalid URL: {url}. Must start with http:// or https://"));
        }
        let payload = json!({
            "content": url,
            "content_type": "url",
            "section_title": title.map(|t| t.to_string()).unwrap_or_else(|| format!("URL: {url}")),
        });
        self.post_add(payload).await
    }

    pub async fn add_binary(
        &self,
        path: &str,
        notes: Option<&str>,
        title: Option<&str>,
    ) -> Result<Value> {
        if !Path::new(path).exists() {
            return Err(anyhow!("Binary file not found: {path}"));
        }
        let name = file_name(path);
        let mut payload = json!({
            "content": path,
            "content_type": "binary",
            "filename": name,
            "directory": parent_dir(path),
            "section_title": title.map(|t| t.to_string()).unwrap_or_else(|| format!("Binary: {name}")),
        });
        if let Some(notes) = notes {
            payload["notes"] = json!(notes);
        }
        self.post_add(payload).await
    }

    async fn post_add(&self, payload: Value) -> Result<Value> {
        let resp = self
            .http
            .post(self.url("/add"))
            .header("X-API-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to add to Memory Bank")?;
        Self::parse(resp).await
    }

    pub async fn update(
        &self,
        id: &str,
        content: &str,
        title: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Value> {
        let mut payload = json!({"id": id, "content": content});
        if let Some(title) = title {
            payload["section_title"] = json!(title);
        }
        if let Some(kind) = content_type {
            payload["content_type"] = json!(kind);
        }
        let resp = self
            .http
            .put(self.url("/update"))
            .header("X-API-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to update Memory Bank")?;
        Self::parse(resp).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value> {
        let resp = self
            .http
            .delete(self.url("/delete"))
            .header("X-API-Key", &self.api_key)
            .json(&json!({"id": id}))
            .send()
            .await
            .context("Failed to delete from Memory Bank")?;
        Self::parse(resp).await
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

fn parent_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("")
        .to_string()
}

// ---- terminal rendering ----

fn text_of<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("unknown")
}

pub fn print_health(data: &Value) {
    println!("✅ Connected to Memory Bank API");
    println!("   Weaviate version: {}", text_of(data, "weaviate_version"));
    println!("   API version: {}", text_of(data, "api_version"));
}

pub fn print_query_results(data: &Value) {
    let count = data
        .get("results_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    println!("✅ Found {count} results for query: '{}'", text_of(data, "query"));

    let empty = vec![];
    let results = data
        .get("results")
        .and_then(|v| v.as_array())
        .unwrap_or(&empty);
    for (i, result) in results.iter().enumerate() {
        let kind = result
            .get("content_type")
            .and_then(|v| v.as_str())
            .unwrap_or("text");
        println!("\n--- Result {} ---", i + 1);
        println!("ID: {}", text_of(result, "id"));
        println!("File: {}", text_of(result, "filename"));
        println!("Type: {kind}");
        match kind {
            "text" => {
                let content = result.get("content").and_then(|v| v.as_str()).unwrap_or("");
                let preview: String = content.chars().take(200).collect();
                let ellipsis = if content.chars().count() > 200 { "..." } else { "" };
                println!("Content Preview: {preview}{ellipsis}");
            }
            "image" => {
                println!("Image format: {}", text_of(result, "image_format"));
            }
            "url" => {
                println!("URL: {}", text_of(result, "url"));
                println!("Title: {}", text_of(result, "url_title"));
                println!(
                    "Is MCP: {}",
                    result.get("is_mcp").and_then(|v| v.as_bool()).unwrap_or(false)
                );
            }
            "binary" => {
                println!("Binary type: {}", text_of(result, "binary_type"));
                let size = result.get("binary_size").and_then(|v| v.as_f64()).unwrap_or(0.0);
                println!("Binary size: {:.2} MB", size / 1024.0 / 1024.0);
            }
            _ => {}
        }
    }
}

pub fn print_add_result(data: &Value) {
    println!("✅ Successfully added to Memory Bank");
    match text_of(data, "content_type") {
        "text" => {
            println!("   Filename: {}", text_of(data, "filename"));
            let chunks = data
                .get("chunk_ids")
                .and_then(|v| v.as_array())
                .map(|a| a.len())
                .unwrap_or(0);
            println!("   Chunks: {chunks}");
        }
        "image" => println!("   Image: {}", text_of(data, "filename")),
        "url" => {
            println!("   URL: {}", text_of(data, "url"));
            println!("   Title: {}", text_of(data, "title"));
            println!(
                "   Is MCP: {}",
                data.get("is_mcp").and_then(|v| v.as_bool()).unwrap_or(false)
            );
        }
        "binary" => {
            println!("   Binary file: {}", text_of(data, "filename"));
            println!("   File type: {}", text_of(data, "file_type"));
            println!("   File hash: {}", text_of(data, "file_hash"));
        }
        other => println!("   Content type: {other}"),
    }
}

pub fn print_update_result(data: &Value) {
    println!("✅ Successfully updated document in Memory Bank");
    println!("   ID: {}", text_of(data, "id"));
}

pub fn print_delete_result(data: &Value) {
    println!("✅ Successfully deleted document from Memory Bank");
    println!("   ID: {}", text_of(data, "id"));
}
