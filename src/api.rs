//! REST gateway: the authenticated CRUD surface in front of Weaviate.

use crate::config::Settings;
use crate::errors::MemoryBankError;
use crate::ingest;
use crate::model::*;
use crate::weaviate::WeaviateClient;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    serve, Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub weaviate: WeaviateClient,
    /// Outbound client for URL scraping; separate from the Weaviate driver.
    pub scraper: reqwest::Client,
    pub api_key: String,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/query", post(query))
        .route("/add", post(add))
        .route("/update", put(update))
        .route("/delete", delete(delete_document))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let provided = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if provided != Some(state.api_key.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized - Invalid API Key"})),
        )
            .into_response();
    }
    next.run(req).await
}

// JSON extractor answering malformed or incomplete bodies with 400 and a
// JSON error, instead of axum's plain-text 422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": rejection.body_text()})),
            )
                .into_response()),
        }
    }
}

// Map driver/ingest failures onto the status codes the clients rely on.
fn error_response(e: anyhow::Error) -> Response {
    let status = match e.downcast_ref::<MemoryBankError>() {
        Some(MemoryBankError::NotFound(_)) | Some(MemoryBankError::FileNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        Some(MemoryBankError::InvalidUrl(_)) | Some(MemoryBankError::UnsupportedContentType(_)) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

// GET /health - reachability of this API and of Weaviate behind it
async fn health(State(state): State<AppState>) -> Response {
    match state.weaviate.server_version().await {
        Ok(version) => Json(json!({
            "status": "healthy",
            "weaviate_version": version,
            "api_version": crate::VERSION,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}

// POST /query - BM25 search, optionally filtered to one content kind
async fn query(State(state): State<AppState>, ApiJson(req): ApiJson<QueryRequest>) -> Response {
    let filter = (req.content_type != "all").then_some(req.content_type.as_str());
    match state.weaviate.bm25_search(&req.query, req.limit, filter).await {
        Ok(objects) => {
            let results: Vec<_> = objects.into_iter().map(format_hit).collect();
            Json(json!({
                "query": req.query,
                "results_count": results.len(),
                "results": results,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("Query failed: {e}");
            error_response(e)
        }
    }
}

// Lift the Weaviate id to the top level and drop null properties so each hit
// only carries the fields of its kind.
fn format_hit(mut obj: serde_json::Value) -> serde_json::Value {
    let id = obj.pointer("/_additional/id").cloned();
    if let Some(map) = obj.as_object_mut() {
        map.remove("_additional");
        map.retain(|_, v| !v.is_null());
        if let Some(id) = id {
            map.insert("id".to_string(), id);
        }
    }
    obj
}

// POST /add - route by content kind, insert with explicit vectors
async fn add(State(state): State<AppState>, ApiJson(req): ApiJson<AddRequest>) -> Response {
    match req.content_type {
        ContentKind::Text => {
            let prepared = ingest::prepare_text(
                &req.content,
                req.filename,
                req.directory,
                req.section_title,
                req.tags,
            );
            if prepared.is_empty() {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Missing 'content' in request body"})),
                )
                    .into_response();
            }
            let filename = prepared[0].properties.filename.clone();
            let count = prepared.len();
            let result = if count == 1 {
                state
                    .weaviate
                    .insert_object(&prepared[0].properties, &prepared[0].vector)
                    .await
                    .map(|id| vec![id])
            } else {
                let objects: Vec<_> = prepared
                    .into_iter()
                    .map(|p| (p.properties, p.vector))
                    .collect();
                state.weaviate.insert_batch(&objects).await
            };
            match result {
                Ok(chunk_ids) => Json(json!({
                    "status": "success",
                    "message": format!("Added {count} chunks to Memory Bank"),
                    "chunk_ids": chunk_ids,
                    "filename": filename,
                    "content_type": "text",
                }))
                .into_response(),
                Err(e) => {
                    tracing::error!("Text ingestion failed: {e}");
                    error_response(e)
                }
            }
        }
        ContentKind::Image => {
            let prepared =
                match ingest::prepare_image(&req.content, req.directory, req.section_title, req.tags)
                {
                    Ok(p) => p,
                    Err(e) => return error_response(e),
                };
            let filename = prepared.properties.filename.clone();
            match state
                .weaviate
                .insert_object(&prepared.properties, &prepared.vector)
                .await
            {
                Ok(id) => Json(json!({
                    "status": "success",
                    "message": "Added image to Memory Bank",
                    "id": id,
                    "filename": filename,
                    "content_type": "image",
                }))
                .into_response(),
                Err(e) => error_response(e),
            }
        }
        ContentKind::Url => {
            let prepared = match ingest::prepare_url(
                &state.scraper,
                &req.content,
                req.directory,
                req.section_title,
                req.tags,
            )
            .await
            {
                Ok(p) => p,
                Err(e) => return error_response(e),
            };
            let title = prepared.properties.url_title.clone();
            let is_mcp = prepared.properties.is_mcp.unwrap_or(false);
            match state
                .weaviate
                .insert_object(&prepared.properties, &prepared.vector)
                .await
            {
                Ok(id) => Json(json!({
                    "status": "success",
                    "message": "Added URL to Memory Bank",
                    "id": id,
                    "url": req.content,
                    "title": title,
                    "is_mcp": is_mcp,
                    "content_type": "url",
                }))
                .into_response(),
                Err(e) => error_response(e),
            }
        }
        ContentKind::Binary => {
            let prepared = match ingest::prepare_binary(
                &req.content,
                req.notes,
                req.directory,
                req.section_title,
                req.tags,
            ) {
                Ok(p) => p,
                Err(e) => return error_response(e),
            };
            let filename = prepared.properties.filename.clone();
            let file_type = prepared.properties.binary_type.clone();
            let file_hash = prepared.properties.binary_hash.clone();
            match state
                .weaviate
                .insert_object(&prepared.properties, &prepared.vector)
                .await
            {
                Ok(id) => Json(json!({
                    "status": "success",
                    "message": "Added binary file to Memory Bank",
                    "id": id,
                    "filename": filename,
                    "file_type": file_type,
                    "file_hash": file_hash,
                    "content_type": "binary",
                }))
                .into_response(),
                Err(e) => error_response(e),
            }
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Unsupported content type: {other}")})),
        )
            .into_response(),
    }
}

// PUT /update - the stored object's kind decides how the patch is built
async fn update(State(state): State<AppState>, ApiJson(req): ApiJson<UpdateRequest>) -> Response {
    let existing = match state.weaviate.get_object(&req.id).await {
        Ok(Some(obj)) => obj,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("Document with ID {} not found", req.id)})),
            )
                .into_response()
        }
        Err(e) => return error_response(e),
    };

    let existing_kind = existing
        .pointer("/properties/content_type")
        .and_then(|v| v.as_str())
        .and_then(ContentKind::parse)
        .unwrap_or(ContentKind::Text);
    let kind = req.content_type.unwrap_or(existing_kind);

    let (properties, vector) = match kind {
        ContentKind::Text => ingest::text_update(&req.content, req.section_title.as_deref()),
        ContentKind::Url => {
            match ingest::url_update(&state.scraper, &req.content, req.section_title.as_deref())
                .await
            {
                Ok(patch) => patch,
                Err(e) => return error_response(e),
            }
        }
        ContentKind::Binary => {
            ingest::binary_update(&existing, req.notes.as_deref(), req.section_title.as_deref())
        }
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("Updates not supported for content type: {other}")})),
            )
                .into_response()
        }
    };

    match state
        .weaviate
        .patch_object(&req.id, properties, vector.as_deref())
        .await
    {
        Ok(()) => Json(json!({
            "status": "success",
            "message": format!("Updated document {}", req.id),
            "id": req.id,
            "content_type": kind.as_str(),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Update failed for {}: {e}", req.id);
            error_response(e)
        }
    }
}

// DELETE /delete - delete by UUID
async fn delete_document(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DeleteRequest>,
) -> Response {
    match state.weaviate.delete_object(&req.id).await {
        Ok(()) => Json(json!({
            "status": "success",
            "message": format!("Deleted document with ID: {}", req.id),
            "id": req.id,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Delete failed for {}: {e}", req.id);
            error_response(e)
        }
    }
}

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let weaviate = WeaviateClient::new(&settings.weaviate_url)?;
    if let Err(e) = weaviate.ensure_schema().await {
        // The gateway still starts; /health will keep reporting the outage.
        tracing::warn!("Could not ensure schema on startup: {e}");
    }

    let state = AppState {
        weaviate,
        scraper: reqwest::Client::new(),
        api_key: settings.api_key.clone(),
    };

    let app = router(state);
    let listener = TcpListener::bind(&settings.api_addr).await?;
    tracing::info!("API listening on {}", settings.api_addr);
    serve(listener, app).await?;
    Ok(())
}
