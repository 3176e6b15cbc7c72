//! Content-type routing helpers: URL validation and scraping, file kind
//! detection, image encoding and binary hashing.

use crate::errors::Result;
use crate::model::ContentKind;
use anyhow::Context;
use base64::Engine;
use md5::{Digest, Md5};
use regex::Regex;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

const URL_PATTERN: &str =
    r"^https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*$";

const MCP_PATTERN: &str = r"admin\.|manage\.|dashboard\.|control\.|cpanel|plesk|whm|webmin|admin-console|management|manage|controlpanel";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "py", "js", "rs", "html", "css", "json", "xml"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

pub fn is_url(text: &str) -> bool {
    Regex::new(URL_PATTERN)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

pub fn is_image_file(filename: &str) -> bool {
    matches!(extension_of(filename), Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Extension-based kind detection for uploaded or referenced files.
pub fn detect_file_kind(path: &str) -> ContentKind {
    match extension_of(path) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => ContentKind::Image,
        Some(ext) if TEXT_EXTENSIONS.contains(&ext.as_str()) => ContentKind::Text,
        Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => ContentKind::Document,
        _ => ContentKind::Binary,
    }
}

/// Whether a URL looks like a management-console service, judged from its
/// domain and path.
pub fn is_mcp_url(url: &str) -> bool {
    let (domain, path) = domain_and_path(url);
    Regex::new(MCP_PATTERN)
        .map(|re| re.is_match(&domain) || re.is_match(&path))
        .unwrap_or(false)
}

fn domain_and_path(url: &str) -> (String, String) {
    let rest = url
        .split_once("://")
        .map(|(_, r)| r)
        .unwrap_or(url)
        .to_ascii_lowercase();
    match rest.split_once('/') {
        Some((domain, path)) => (domain.to_string(), format!("/{path}")),
        None => (rest, String::new()),
    }
}

/// Metadata scraped from a URL. Fetch failures leave the optional fields
/// empty rather than failing the caller, matching the forgiving behavior of
/// the add path.
#[derive(Debug, Clone, Serialize)]
pub struct UrlMetadata {
    pub url: String,
    pub domain: String,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_mcp: bool,
}

pub async fn fetch_url_metadata(http: &reqwest::Client, url: &str) -> UrlMetadata {
    let (domain, _) = domain_and_path(url);
    let mut meta = UrlMetadata {
        url: url.to_string(),
        domain,
        status_code: None,
        content_type: None,
        title: None,
        description: None,
        is_mcp: is_mcp_url(url),
    };

    let response = match http
        .get(url)
        .timeout(Duration::from_secs(crate::defaults::SCRAPE_TIMEOUT_S))
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!("Failed to fetch URL metadata for {url}: {e}");
            return meta;
        }
    };

    meta.status_code = Some(response.status().as_u16());
    meta.content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let is_html = meta
        .content_type
        .as_deref()
        .map(|ct| ct.contains("text/html"))
        .unwrap_or(false);
    if !is_html {
        return meta;
    }

    match response.text().await {
        Ok(body) => {
            meta.title = scrape_title(&body);
            meta.description = scrape_description(&body);
        }
        Err(e) => tracing::warn!("Failed to read body of {url}: {e}"),
    }
    meta
}

pub fn scrape_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn scrape_description(html: &str) -> Option<String> {
    let re = Regex::new(
        r#"(?is)<meta\s+name=["'](?:description|summary)["']\s+content=["'](.*?)["']"#,
    )
    .ok()?;
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Streaming MD5 of a file, returned as lowercase hex. The hash identifies
/// binary files across re-adds; it is not used for security.
pub fn hash_file_md5(path: &str) -> Result<String> {
    let mut file = std::fs::File::open(path).with_context(|| format!("Failed to open {path}"))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).context("Failed to read file")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

pub fn encode_image_base64(path: &str) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image {path}"))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url_accepts_http_and_https() {
        assert!(is_url("https://example.com"));
        assert!(is_url("http://www.example.com/path?x=1"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("not a url"));
        assert!(!is_url("example.com"));
    }

    #[test]
    fn test_image_extension_detection() {
        assert!(is_image_file("photo.PNG"));
        assert!(is_image_file("dir/pic.jpeg"));
        assert!(!is_image_file("notes.md"));
        assert!(!is_image_file("no_extension"));
    }

    #[test]
    fn test_detect_file_kind() {
        assert_eq!(detect_file_kind("a.png"), ContentKind::Image);
        assert_eq!(detect_file_kind("a.md"), ContentKind::Text);
        assert_eq!(detect_file_kind("a.pdf"), ContentKind::Document);
        assert_eq!(detect_file_kind("a.bin"), ContentKind::Binary);
        assert_eq!(detect_file_kind("archive.tar.gz"), ContentKind::Binary);
    }

    #[test]
    fn test_mcp_detection_on_domain_and_path() {
        assert!(is_mcp_url("https://admin.example.com"));
        assert!(is_mcp_url("https://example.com/cpanel"));
        assert!(is_mcp_url("https://host.example.com/management/login"));
        assert!(!is_mcp_url("https://example.com/blog"));
    }

    #[test]
    fn test_scrape_title_and_description() {
        let html = r#"<html><head>
            <title> Flight Deals </title>
            <meta name="description" content="Cheap flights weekly">
        </head></html>"#;
        assert_eq!(scrape_title(html).as_deref(), Some("Flight Deals"));
        assert_eq!(
            scrape_description(html).as_deref(),
            Some("Cheap flights weekly")
        );
        assert_eq!(scrape_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_hash_file_md5_known_value() {
        let dir = std::env::temp_dir().join("membank-md5-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hello.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let hash = hash_file_md5(path.to_str().unwrap()).unwrap();
        // md5("hello world")
        assert_eq!(hash, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }
}
