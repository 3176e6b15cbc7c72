//! Tests for the CLI's API client: each method must issue the expected HTTP
//! verb, path, key header and payload. A recording stub plays the gateway.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::{Json, Router};
use membank::client::ApiClient;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    fn last(&self) -> Recorded {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

async fn record(State(recorder): State<Recorder>, request: Request) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    recorder.calls.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        api_key: parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        body,
    });
    Json(json!({"status": "success", "results_count": 0, "results": []}))
}

async fn spawn_recorder() -> (ApiClient, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .fallback(record)
        .with_state(recorder.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (ApiClient::new(format!("http://{addr}"), "secret-key"), recorder)
}

#[tokio::test]
async fn test_health_uses_get_without_key() {
    let (client, recorder) = spawn_recorder().await;
    client.health().await.unwrap();
    let call = recorder.last();
    assert_eq!(call.method, "GET");
    assert_eq!(call.path, "/health");
    assert_eq!(call.api_key, None);
}

#[tokio::test]
async fn test_query_posts_with_key() {
    let (client, recorder) = spawn_recorder().await;
    client.query("flight deals", 5, "all").await.unwrap();
    let call = recorder.last();
    assert_eq!(call.method, "POST");
    assert_eq!(call.path, "/query");
    assert_eq!(call.api_key.as_deref(), Some("secret-key"));
    assert_eq!(call.body["query"], json!("flight deals"));
    assert_eq!(call.body["limit"], json!(5));
    // "all" means no filter at all, not a filter named "all".
    assert!(call.body.get("content_type").is_none());

    client.query("flight deals", 3, "url").await.unwrap();
    assert_eq!(recorder.last().body["content_type"], json!("url"));
}

#[tokio::test]
async fn test_add_text_payload() {
    let (client, recorder) = spawn_recorder().await;
    client
        .add_text("some notes", Some("notes.md"), Some("inbox"), Some("Notes"))
        .await
        .unwrap();
    let call = recorder.last();
    assert_eq!(call.method, "POST");
    assert_eq!(call.path, "/add");
    assert_eq!(call.body["content"], json!("some notes"));
    assert_eq!(call.body["content_type"], json!("text"));
    assert_eq!(call.body["filename"], json!("notes.md"));
    assert_eq!(call.body["directory"], json!("inbox"));
    assert_eq!(call.body["section_title"], json!("Notes"));
}

#[tokio::test]
async fn test_add_image_sends_path_and_metadata() {
    let (client, recorder) = spawn_recorder().await;
    let dir = std::env::temp_dir().join("membank-client-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("shot.png");
    std::fs::write(&path, b"fake image bytes").unwrap();

    client.add_image(path.to_str().unwrap(), None).await.unwrap();
    let call = recorder.last();
    assert_eq!(call.body["content_type"], json!("image"));
    assert_eq!(call.body["filename"], json!("shot.png"));
    assert_eq!(call.body["section_title"], json!("Image: shot.png"));
}

#[tokio::test]
async fn test_add_image_rejects_missing_file_without_calling_api() {
    let (client, recorder) = spawn_recorder().await;
    let err = client.add_image("/nonexistent/shot.png", None).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn test_add_url_rejects_bad_scheme_without_calling_api() {
    let (client, recorder) = spawn_recorder().await;
    let err = client.add_url("ftp://example.com", None).await.unwrap_err();
    assert!(err.to_string().contains("Invalid URL"));
    assert_eq!(recorder.count(), 0);

    client
        .add_url("https://example.com/deals", Some("Deals"))
        .await
        .unwrap();
    let call = recorder.last();
    assert_eq!(call.body["content"], json!("https://example.com/deals"));
    assert_eq!(call.body["content_type"], json!("url"));
    assert_eq!(call.body["section_title"], json!("Deals"));
}

#[tokio::test]
async fn test_add_binary_includes_notes() {
    let (client, recorder) = spawn_recorder().await;
    let dir = std::env::temp_dir().join("membank-client-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("tool.bin");
    std::fs::write(&path, b"binary payload").unwrap();

    client
        .add_binary(path.to_str().unwrap(), Some("build artifact"), None)
        .await
        .unwrap();
    let call = recorder.last();
    assert_eq!(call.body["content_type"], json!("binary"));
    assert_eq!(call.body["filename"], json!("tool.bin"));
    assert_eq!(call.body["notes"], json!("build artifact"));
}

#[tokio::test]
async fn test_update_uses_put() {
    let (client, recorder) = spawn_recorder().await;
    client
        .update("abc-123", "new content", Some("Title"), Some("text"))
        .await
        .unwrap();
    let call = recorder.last();
    assert_eq!(call.method, "PUT");
    assert_eq!(call.path, "/update");
    assert_eq!(call.api_key.as_deref(), Some("secret-key"));
    assert_eq!(call.body["id"], json!("abc-123"));
    assert_eq!(call.body["content"], json!("new content"));
    assert_eq!(call.body["section_title"], json!("Title"));
    assert_eq!(call.body["content_type"], json!("text"));
}

#[tokio::test]
async fn test_delete_uses_delete_verb() {
    let (client, recorder) = spawn_recorder().await;
    client.delete("abc-123").await.unwrap();
    let call = recorder.last();
    assert_eq!(call.method, "DELETE");
    assert_eq!(call.path, "/delete");
    assert_eq!(call.api_key.as_deref(), Some("secret-key"));
    assert_eq!(call.body, json!({"id": "abc-123"}));
}

#[tokio::test]
async fn test_non_success_status_surfaces_as_error() {
    let app = Router::new().fallback(|| async {
        (StatusCode::INTERNAL_SERVER_ERROR, "weaviate exploded")
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let client = ApiClient::new(format!("http://{addr}"), "secret-key");
    let err = client.query("anything", 3, "all").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("500"), "unexpected error: {msg}");
    assert!(msg.contains("weaviate exploded"), "unexpected error: {msg}");
}
