//! Turns add/update requests into Weaviate-ready `(properties, vector)`
//! pairs, routed by content kind.
//!
//! Text is chunked before insert; images are inlined as base64; URLs are
//! scraped for title/description; binary files are fingerprinted with MD5.

use crate::chunker::MarkdownSplitter;
use crate::content;
use crate::embed::seeded_vector;
use crate::errors::{MemoryBankError, Result};
use crate::model::{ChunkProperties, ContentKind};
use anyhow::anyhow;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::path::Path;

#[derive(Debug)]
pub struct PreparedObject {
    pub properties: ChunkProperties,
    pub vector: Vec<f32>,
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Chunk a text document. Each chunk carries its own vector; multi-chunk
/// documents get "(Part n)" section titles so hits stay attributable.
pub fn prepare_text(
    content: &str,
    filename: Option<String>,
    directory: Option<String>,
    section_title: Option<String>,
    tags: Option<String>,
) -> Vec<PreparedObject> {
    let filename = filename
        .unwrap_or_else(|| format!("generated_{}.md", Utc::now().format("%Y%m%d_%H%M%S")));
    let directory = directory.unwrap_or_else(|| "generated".to_string());
    let section_title = section_title.unwrap_or_else(|| "Generated Content".to_string());
    let filepath = format!("memory_bank/{directory}/{filename}");

    let chunks = MarkdownSplitter::default().split(content);
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let title = if total > 1 {
                format!("{} (Part {})", section_title, i + 1)
            } else {
                section_title.clone()
            };
            let vector = seeded_vector(&chunk);
            let size_kb = chunk.len() as f64 / 1024.0;
            let mut properties = ChunkProperties::base(
                chunk,
                filepath.clone(),
                filename.clone(),
                directory.clone(),
                title,
                size_kb,
                ContentKind::Text,
            );
            properties.tags = tags.clone();
            PreparedObject { properties, vector }
        })
        .collect()
}

/// Inline an image file as a base64 blob. The vector is seeded from the file
/// name; there is no image embedding model in the loop.
pub fn prepare_image(
    path: &str,
    directory: Option<String>,
    section_title: Option<String>,
    tags: Option<String>,
) -> Result<PreparedObject> {
    if !Path::new(path).exists() {
        return Err(anyhow!(MemoryBankError::FileNotFound(path.to_string())));
    }
    let name = basename(path);
    let image_data = content::encode_image_base64(path)?;
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let mut properties = ChunkProperties::base(
        format!("Image: {name}"),
        path.to_string(),
        name.clone(),
        directory.unwrap_or_else(|| "generated".to_string()),
        section_title.unwrap_or_else(|| format!("Image: {name}")),
        size_bytes as f64 / 1024.0,
        ContentKind::Image,
    );
    properties.image_data = Some(image_data);
    properties.image_format = content::extension_of(path);
    properties.tags = tags;

    let vector = seeded_vector(&name);
    Ok(PreparedObject { properties, vector })
}

/// Scrape a URL and store its metadata. The vector is seeded from the URL
/// plus whatever title/description the scrape produced.
pub async fn prepare_url(
    http: &reqwest::Client,
    url: &str,
    directory: Option<String>,
    section_title: Option<String>,
    tags: Option<String>,
) -> Result<PreparedObject> {
    if !content::is_url(url) {
        return Err(anyhow!(MemoryBankError::InvalidUrl(url.to_string())));
    }
    let meta = content::fetch_url_metadata(http, url).await;

    let mut vector_text = url.to_string();
    if let Some(title) = &meta.title {
        vector_text.push(' ');
        vector_text.push_str(title);
    }
    if let Some(desc) = &meta.description {
        vector_text.push(' ');
        vector_text.push_str(desc);
    }

    let summary = format!(
        "URL: {url}\nTitle: {}\nDescription: {}",
        meta.title.as_deref().unwrap_or("N/A"),
        meta.description.as_deref().unwrap_or("N/A"),
    );
    let mut properties = ChunkProperties::base(
        summary,
        String::new(),
        format!("url_{}.txt", Utc::now().format("%Y%m%d_%H%M%S")),
        directory.unwrap_or_else(|| "generated".to_string()),
        section_title.unwrap_or_else(|| format!("URL: {url}")),
        0.1, // nominal size
        ContentKind::Url,
    );
    properties.url = Some(url.to_string());
    properties.url_title = meta.title.clone();
    properties.url_description = meta.description.clone();
    properties.is_mcp = Some(meta.is_mcp);
    properties.tags = tags;

    let vector = seeded_vector(&vector_text);
    Ok(PreparedObject { properties, vector })
}

/// Fingerprint a binary file: MD5, detected kind, optional notes.
pub fn prepare_binary(
    path: &str,
    notes: Option<String>,
    directory: Option<String>,
    section_title: Option<String>,
    tags: Option<String>,
) -> Result<PreparedObject> {
    if !Path::new(path).exists() {
        return Err(anyhow!(MemoryBankError::FileNotFound(path.to_string())));
    }
    let name = basename(path);
    let kind = content::detect_file_kind(path);
    let hash = content::hash_file_md5(path)?;
    let notes = notes.unwrap_or_else(|| "No additional notes".to_string());
    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    let mut properties = ChunkProperties::base(
        format!("Binary File: {name}\nType: {kind}\nNotes: {notes}"),
        path.to_string(),
        name.clone(),
        directory.unwrap_or_else(|| "generated".to_string()),
        section_title.unwrap_or_else(|| format!("Binary: {name}")),
        size_bytes as f64 / 1024.0,
        ContentKind::Binary,
    );
    properties.binary_hash = Some(hash.clone());
    properties.binary_type = Some(kind.to_string());
    properties.binary_notes = Some(notes);
    properties.binary_size = Some(size_bytes);
    properties.tags = tags;

    let vector = seeded_vector(&format!("{name}{hash}"));
    Ok(PreparedObject { properties, vector })
}

// ---- update patch builders ----

/// Patch for a text object: new content, new vector.
pub fn text_update(content: &str, section_title: Option<&str>) -> (Value, Option<Vec<f32>>) {
    let mut props = json!({
        "content": content,
        "last_modified": now_rfc3339(),
        "file_size_kb": content.len() as f64 / 1024.0,
    });
    if let Some(title) = section_title {
        props["section_title"] = json!(title);
    }
    (props, Some(seeded_vector(content)))
}

/// Patch for a URL object: refetch metadata, reseed the vector.
pub async fn url_update(
    http: &reqwest::Client,
    url: &str,
    section_title: Option<&str>,
) -> Result<(Value, Option<Vec<f32>>)> {
    if !content::is_url(url) {
        return Err(anyhow!(MemoryBankError::InvalidUrl(url.to_string())));
    }
    let meta = content::fetch_url_metadata(http, url).await;

    let mut vector_text = url.to_string();
    if let Some(title) = &meta.title {
        vector_text.push(' ');
        vector_text.push_str(title);
    }
    if let Some(desc) = &meta.description {
        vector_text.push(' ');
        vector_text.push_str(desc);
    }

    let mut props = json!({
        "content": format!(
            "URL: {url}\nTitle: {}\nDescription: {}",
            meta.title.as_deref().unwrap_or("N/A"),
            meta.description.as_deref().unwrap_or("N/A"),
        ),
        "last_modified": now_rfc3339(),
        "url": url,
        "url_title": meta.title,
        "url_description": meta.description,
        "is_mcp": meta.is_mcp,
    });
    if let Some(title) = section_title {
        props["section_title"] = json!(title);
    }
    Ok((props, Some(seeded_vector(&vector_text))))
}

/// Patch for a binary object: only the notes change, the vector is kept.
pub fn binary_update(
    existing: &Value,
    notes: Option<&str>,
    section_title: Option<&str>,
) -> (Value, Option<Vec<f32>>) {
    let notes = notes.unwrap_or("No additional notes");
    let filename = existing
        .pointer("/properties/filename")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let binary_type = existing
        .pointer("/properties/binary_type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let mut props = json!({
        "content": format!("Binary File: {filename}\nType: {binary_type}\nNotes: {notes}"),
        "last_modified": now_rfc3339(),
        "binary_notes": notes,
    });
    if let Some(title) = section_title {
        props["section_title"] = json!(title);
    }
    (props, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_object() {
        let prepared = prepare_text("a short note", None, None, Some("Notes".into()), None);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].properties.section_title, "Notes");
        assert_eq!(prepared[0].properties.content_type, ContentKind::Text);
        assert_eq!(prepared[0].vector.len(), crate::defaults::VECTOR_DIM);
    }

    #[test]
    fn test_long_text_gets_part_titles() {
        let text = "paragraph text here. ".repeat(200);
        let prepared = prepare_text(&text, Some("big.md".into()), None, Some("Doc".into()), None);
        assert!(prepared.len() > 1);
        assert_eq!(prepared[0].properties.section_title, "Doc (Part 1)");
        assert_eq!(prepared[1].properties.section_title, "Doc (Part 2)");
        for obj in &prepared {
            assert_eq!(obj.properties.filename, "big.md");
            assert_eq!(obj.properties.filepath, "memory_bank/generated/big.md");
        }
    }

    #[test]
    fn test_prepare_image_rejects_missing_file() {
        let err = prepare_image("/nonexistent/photo.png", None, None, None).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_prepare_image_encodes_file() {
        let dir = std::env::temp_dir().join("membank-ingest-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pixel.png");
        std::fs::write(&path, [0x89u8, 0x50, 0x4E, 0x47]).unwrap();
        let prepared = prepare_image(path.to_str().unwrap(), None, None, None).unwrap();
        assert_eq!(prepared.properties.content_type, ContentKind::Image);
        assert_eq!(prepared.properties.image_format.as_deref(), Some("png"));
        assert_eq!(prepared.properties.image_data.as_deref(), Some("iVBORw=="));
        assert_eq!(prepared.properties.filename, "pixel.png");
    }

    #[test]
    fn test_prepare_binary_hashes_file() {
        let dir = std::env::temp_dir().join("membank-ingest-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("blob.dat");
        std::fs::write(&path, b"hello world").unwrap();
        let prepared =
            prepare_binary(path.to_str().unwrap(), Some("demo".into()), None, None, None).unwrap();
        assert_eq!(
            prepared.properties.binary_hash.as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(prepared.properties.binary_size, Some(11));
        assert!(prepared.properties.content.contains("Notes: demo"));
    }

    #[tokio::test]
    async fn test_prepare_url_rejects_invalid() {
        let http = reqwest::Client::new();
        let err = prepare_url(&http, "not-a-url", None, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_binary_update_keeps_vector() {
        let existing = json!({
            "properties": {"filename": "tool.bin", "binary_type": "binary"}
        });
        let (props, vector) = binary_update(&existing, Some("new notes"), None);
        assert!(vector.is_none());
        assert_eq!(props["binary_notes"], json!("new notes"));
        assert!(props["content"]
            .as_str()
            .unwrap()
            .contains("Binary File: tool.bin"));
    }

    #[test]
    fn test_text_update_reseeds_vector() {
        let (props, vector) = text_update("fresh content", Some("New Title"));
        assert_eq!(props["section_title"], json!("New Title"));
        assert_eq!(vector, Some(seeded_vector("fresh content")));
    }
}
