//! Web dashboard: collection stats plus add/delete forms.
//!
//! Unlike the REST gateway this talks to Weaviate directly and is meant for
//! a trusted local network; there is no API-key check here.

use crate::config::Settings;
use crate::content;
use crate::embed::seeded_vector;
use crate::model::{ChunkProperties, ContentKind};
use crate::weaviate::WeaviateClient;
use askama::Template;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    serve, Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

const METRICS_PREVIEW_LINES: usize = 10;

#[derive(Clone)]
pub struct WebState {
    pub weaviate: WeaviateClient,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    ready: bool,
    error: Option<String>,
    flash: Option<String>,
    total: u64,
    version: String,
    node_count: usize,
    metrics: String,
    entries: Vec<EntryRow>,
}

struct EntryRow {
    id: String,
    filename: String,
    content_type: String,
    vector_norm: String,
}

#[derive(Deserialize)]
struct FlashParams {
    added: Option<String>,
    deleted: Option<String>,
    err: Option<String>,
}

#[derive(Deserialize)]
struct DeleteForm {
    entry_id: String,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add_entry))
        .route("/delete", post(delete_entry))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn flash_message(params: &FlashParams) -> Option<String> {
    if let Some(id) = &params.added {
        return Some(format!("Successfully added entry {id}"));
    }
    if let Some(id) = &params.deleted {
        return Some(format!("Successfully deleted entry {id}"));
    }
    params.err.as_ref().map(|code| match code.as_str() {
        "no_file" => "No file provided for upload.".to_string(),
        "bad_form" => "The submitted form was incomplete.".to_string(),
        "add_failed" => "Adding the entry failed; see server logs.".to_string(),
        "delete_failed" => "Deleting the entry failed; see server logs.".to_string(),
        other => format!("Error: {other}"),
    })
}

async fn index(State(state): State<WebState>, Query(params): Query<FlashParams>) -> Response {
    let flash = flash_message(&params);

    if !state.weaviate.is_ready().await {
        let page = DashboardTemplate {
            ready: false,
            error: Some(format!(
                "Weaviate is not ready or not reachable at {}",
                state.weaviate.base_url()
            )),
            flash,
            total: 0,
            version: "unknown".into(),
            node_count: 0,
            metrics: String::new(),
            entries: Vec::new(),
        };
        return render(page);
    }

    let version = state
        .weaviate
        .server_version()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    let node_count = state
        .weaviate
        .nodes()
        .await
        .ok()
        .and_then(|v| v.get("nodes").and_then(|n| n.as_array()).map(|a| a.len()))
        .unwrap_or(0);
    let metrics = state
        .weaviate
        .metrics_head(METRICS_PREVIEW_LINES)
        .await
        .unwrap_or_default();
    let total = state.weaviate.count_objects().await.unwrap_or(0);

    let entries = match state
        .weaviate
        .list_objects(crate::defaults::DASHBOARD_ENTRY_LIMIT)
        .await
    {
        Ok(objects) => objects.iter().map(entry_row).collect(),
        Err(e) => {
            tracing::error!("Failed to list entries: {e}");
            Vec::new()
        }
    };

    render(DashboardTemplate {
        ready: true,
        error: None,
        flash,
        total,
        version,
        node_count,
        metrics,
        entries,
    })
}

fn entry_row(obj: &serde_json::Value) -> EntryRow {
    let vector_norm = obj
        .pointer("/_additional/vector")
        .and_then(|v| v.as_array())
        .map(|values| {
            let sum_sq: f64 = values
                .iter()
                .filter_map(|v| v.as_f64())
                .map(|v| v * v)
                .sum();
            format!("{:.3}", sum_sq.sqrt())
        })
        .unwrap_or_else(|| "N/A".to_string());
    EntryRow {
        id: obj
            .pointer("/_additional/id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        filename: obj
            .get("filename")
            .and_then(|v| v.as_str())
            .unwrap_or("N/A")
            .to_string(),
        content_type: obj
            .get("content_type")
            .and_then(|v| v.as_str())
            .unwrap_or("text")
            .to_string(),
        vector_norm,
    }
}

fn render(page: DashboardTemplate) -> Response {
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template rendering failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "template error").into_response()
        }
    }
}

// Collected fields of the add form; either pasted text or an uploaded file.
#[derive(Default)]
struct AddForm {
    content_type: String,
    text_content: String,
    filename: String,
    tags: String,
    file_kind: String,
    file_name: Option<String>,
    file_bytes: Option<Vec<u8>>,
}

async fn read_add_form(mut multipart: Multipart) -> Option<AddForm> {
    let mut form = AddForm::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "content_type" => form.content_type = field.text().await.ok()?,
            "text_content" => form.text_content = field.text().await.ok()?,
            "filename_add" => form.filename = field.text().await.ok()?,
            "tags_add" => form.tags = field.text().await.ok()?,
            "file_actual_type" => form.file_kind = field.text().await.ok()?,
            "file_upload" => {
                form.file_name = field.file_name().map(|n| n.to_string());
                form.file_bytes = field.bytes().await.ok().map(|b| b.to_vec());
            }
            _ => {}
        }
    }
    Some(form)
}

async fn add_entry(State(state): State<WebState>, multipart: Multipart) -> Redirect {
    let Some(form) = read_add_form(multipart).await else {
        return Redirect::to("/?err=bad_form");
    };

    let (properties, vector) = match form.content_type.as_str() {
        "text" => {
            let filename = if form.filename.is_empty() {
                format!("web_added_{}.md", Utc::now().format("%Y%m%d_%H%M%S"))
            } else {
                form.filename.clone()
            };
            let mut props = ChunkProperties::base(
                form.text_content.clone(),
                format!("/web_ui_added/{filename}"),
                filename,
                "web_ui_added".to_string(),
                "Web UI Added".to_string(),
                form.text_content.len() as f64 / 1024.0,
                ContentKind::Text,
            );
            if !form.tags.is_empty() {
                props.tags = Some(form.tags.clone());
            }
            let vector = seeded_vector(&form.text_content);
            (props, vector)
        }
        "file" => {
            let (Some(bytes), Some(uploaded_name)) = (&form.file_bytes, &form.file_name) else {
                return Redirect::to("/?err=no_file");
            };
            let filename = if form.filename.is_empty() {
                uploaded_name.clone()
            } else {
                form.filename.clone()
            };
            let kind = ContentKind::parse(&form.file_kind)
                .unwrap_or_else(|| content::detect_file_kind(&filename));
            let content = match kind {
                ContentKind::Binary | ContentKind::Image => {
                    format!("Binary file {filename} of type {kind}")
                }
                _ => match String::from_utf8(bytes.clone()) {
                    Ok(text) => {
                        let preview: String = text.chars().take(2000).collect();
                        let ellipsis = if text.chars().count() > 2000 { "..." } else { "" };
                        format!("{preview}{ellipsis}")
                    }
                    Err(_) => format!("Binary file {filename} of type {kind}"),
                },
            };
            let mut props = ChunkProperties::base(
                content,
                format!("/web_ui_added/{filename}"),
                filename.clone(),
                "web_ui_added".to_string(),
                "Web UI Added".to_string(),
                bytes.len() as f64 / 1024.0,
                kind,
            );
            if !form.tags.is_empty() {
                props.tags = Some(form.tags.clone());
            }
            let vector = seeded_vector(&format!("{filename}_{kind}"));
            (props, vector)
        }
        _ => return Redirect::to("/?err=bad_form"),
    };

    match state.weaviate.insert_object(&properties, &vector).await {
        Ok(id) => Redirect::to(&format!("/?added={id}")),
        Err(e) => {
            tracing::error!("Failed to add entry: {e}");
            Redirect::to("/?err=add_failed")
        }
    }
}

async fn delete_entry(State(state): State<WebState>, Form(form): Form<DeleteForm>) -> Redirect {
    match state.weaviate.delete_object(&form.entry_id).await {
        Ok(()) => Redirect::to(&format!("/?deleted={}", form.entry_id)),
        Err(e) => {
            tracing::error!("Failed to delete entry {}: {e}", form.entry_id);
            Redirect::to("/?err=delete_failed")
        }
    }
}

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let weaviate = WeaviateClient::new(&settings.weaviate_url)?;
    if let Err(e) = weaviate.ensure_schema().await {
        tracing::warn!("Could not ensure schema on startup: {e}");
    }

    let app = router(WebState { weaviate });
    let listener = TcpListener::bind(&settings.web_addr).await?;
    tracing::info!("Dashboard listening on {}", settings.web_addr);
    serve(listener, app).await?;
    Ok(())
}
