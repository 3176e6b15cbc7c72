use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weaviate collection holding every stored chunk, regardless of kind.
pub const COLLECTION: &str = "MarkdownChunk";

/// Kind tag stored in the `content_type` property of each object.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Image,
    Url,
    Binary,
    Document,
    Other,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Url => "url",
            ContentKind::Binary => "binary",
            ContentKind::Document => "document",
            ContentKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ContentKind::Text),
            "image" => Some(ContentKind::Image),
            "url" => Some(ContentKind::Url),
            "binary" => Some(ContentKind::Binary),
            "document" => Some(ContentKind::Document),
            "other" => Some(ContentKind::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full property set of a `MarkdownChunk` object. Type-specific fields are
/// optional and omitted from the JSON payload when unset, so the same struct
/// serves all four content kinds.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChunkProperties {
    pub content: String,
    pub filepath: String,
    pub filename: String,
    pub directory: String,
    pub section_title: String,
    pub last_modified: DateTime<Utc>,
    pub file_size_kb: f64,
    pub content_type: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    // image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_format: Option<String>,

    // url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mcp: Option<bool>,

    // binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_size: Option<u64>,
}

impl ChunkProperties {
    /// Core properties with everything type-specific left unset.
    pub fn base(
        content: String,
        filepath: String,
        filename: String,
        directory: String,
        section_title: String,
        file_size_kb: f64,
        content_type: ContentKind,
    ) -> Self {
        Self {
            content,
            filepath,
            filename,
            directory,
            section_title,
            last_modified: Utc::now(),
            file_size_kb,
            content_type,
            tags: None,
            image_data: None,
            image_format: None,
            url: None,
            url_title: None,
            url_description: None,
            is_mcp: None,
            binary_hash: None,
            binary_type: None,
            binary_notes: None,
            binary_size: None,
        }
    }
}

fn default_query_limit() -> usize {
    crate::defaults::QUERY_LIMIT
}

fn default_content_filter() -> String {
    "all".to_string()
}

#[derive(Serialize, Deserialize, Debug)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_query_limit")]
    pub limit: usize,
    /// "all" or one of the content kinds; anything else filters to nothing.
    #[serde(default = "default_content_filter")]
    pub content_type: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AddRequest {
    pub content: String,
    #[serde(default)]
    pub content_type: ContentKind,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UpdateRequest {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub content_type: Option<ContentKind>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DeleteRequest {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_kind_round_trip() {
        for kind in ["text", "image", "url", "binary", "document", "other"] {
            let parsed = ContentKind::parse(kind).unwrap();
            assert_eq!(parsed.as_str(), kind);
        }
        assert!(ContentKind::parse("video").is_none());
    }

    #[test]
    fn test_chunk_properties_skips_unset_fields() {
        let props = ChunkProperties::base(
            "hello".into(),
            "memory_bank/generated/a.md".into(),
            "a.md".into(),
            "generated".into(),
            "Notes".into(),
            0.005,
            ContentKind::Text,
        );
        let value = serde_json::to_value(&props).unwrap();
        assert_eq!(value["content_type"], json!("text"));
        assert!(value.get("image_data").is_none());
        assert!(value.get("binary_hash").is_none());
    }

    #[test]
    fn test_query_request_defaults() {
        let req: QueryRequest = serde_json::from_value(json!({"query": "flights"})).unwrap();
        assert_eq!(req.limit, 3);
        assert_eq!(req.content_type, "all");
    }

    #[test]
    fn test_add_request_defaults_to_text() {
        let req: AddRequest = serde_json::from_value(json!({"content": "notes"})).unwrap();
        assert_eq!(req.content_type, ContentKind::Text);
        assert!(req.filename.is_none());
    }
}
