//! HTTP API over the note store and search index.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/api/notes` | List notes (metadata only, no content) |
//! | `POST`   | `/api/notes` | Create a note, `201 {"id": ...}` |
//! | `GET`    | `/api/notes/{id}` | Fetch one note with its body |
//! | `PUT`    | `/api/notes/{id}` | Overwrite a note's raw content |
//! | `DELETE` | `/api/notes/{id}` | Remove a note |
//! | `GET`    | `/api/search?q=` | Full-text search, best match first |
//! | `GET`    | `/health` | Health check (version, search availability) |
//!
//! Mutations answer as soon as the store write succeeds. The search index
//! is refreshed afterwards by background workers (see [`crate::sync`]), so
//! `/api/search` can lag behind `/api/notes` for a moment.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "note not found: groceries" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500),
//! `search_unavailable` (503). The last one means the index failed to
//! open at startup; note CRUD keeps working without it.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser frontend on
//! another port can call the API.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::NoteError;
use crate::index::SearchIndex;
use crate::models::{Note, NotePayload, SearchHit};
use crate::parser::split_header;
use crate::store::NoteStore;
use crate::sync::{self, IndexQueue};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    store: Arc<NoteStore>,
    /// `None` when the index failed to open; search answers 503.
    index: Option<SearchIndex>,
    /// `None` when no index workers are running.
    queue: Option<IndexQueue>,
}

impl AppState {
    pub fn new(store: Arc<NoteStore>, index: Option<SearchIndex>, queue: Option<IndexQueue>) -> Self {
        Self { store, index, queue }
    }
}

/// Build the API router over `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/notes", get(handle_list).post(handle_create))
        .route(
            "/api/notes/{id}",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .route("/api/search", get(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.server.bind).await?;
    serve(config, listener, shutdown_signal()).await
}

/// Serve the API on an already-bound listener until `shutdown` resolves.
///
/// Opens the search index under the store root and starts the index
/// workers, which rebuild the index in the background before applying
/// updates. If the index cannot be opened the server runs without search. On shutdown the workers get
/// `[sync].shutdown_grace_secs` to drain their queue.
pub async fn serve<F>(config: &Config, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::new(NoteStore::new(&config.store.root));

    let (index, queue, workers) = match SearchIndex::open(store.root()).await {
        Ok(index) => {
            let (queue, workers) = sync::start(store.clone(), index.clone(), &config.sync);
            (Some(index), Some(queue), Some(workers))
        }
        Err(e) => {
            warn!(error = %e, "search disabled");
            (None, None, None)
        }
    };

    let app = router(AppState::new(store.clone(), index.clone(), queue));

    info!(
        addr = %listener.local_addr()?,
        root = %store.root().display(),
        "server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    if let Some(workers) = workers {
        workers
            .shutdown(Duration::from_secs(config.sync.shutdown_grace_secs))
            .await;
    }
    if let Some(index) = index {
        index.close().await;
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<NoteError> for AppError {
    fn from(err: NoteError) -> Self {
        let (status, code) = match &err {
            NoteError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            NoteError::InvalidPath { .. }
            | NoteError::InvalidArgument(_)
            | NoteError::QuerySyntax(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            NoteError::IndexUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "search_unavailable"),
            NoteError::Io(_) | NoteError::Index(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if !err.is_client_error() {
            error!(error = %err, "request failed");
        }
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
    search: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        search: state.index.is_some(),
    })
}

// ============ /api/notes ============

#[derive(Serialize)]
struct IdResponse {
    id: String,
}

async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(state.store.list().await?))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.store.get(&id).await?))
}

/// Handler for `POST /api/notes`.
///
/// Without an explicit `id`, one is derived from the note's title (see
/// [`derive_id`]). The index is updated after the response is decided.
async fn handle_create(
    State(state): State<AppState>,
    payload: Result<Json<NotePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let Json(payload) = payload?;
    let id = derive_id(&payload);

    let id = state.store.save(&id, &payload.content).await?;
    if let Some(queue) = &state.queue {
        queue.note_saved(&id);
    }

    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<NotePayload>, JsonRejection>,
) -> Result<Json<IdResponse>, AppError> {
    let Json(payload) = payload?;

    let id = state.store.save(&id, &payload.content).await?;
    if let Some(queue) = &state.queue {
        queue.note_saved(&id);
    }

    Ok(Json(IdResponse { id }))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IdResponse>, AppError> {
    let id = state.store.delete(&id).await?;
    if let Some(queue) = &state.queue {
        queue.note_deleted(&id);
    }

    Ok(Json(IdResponse { id }))
}

// ============ GET /api/search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Handler for `GET /api/search?q=...`.
///
/// Returns `400` for an empty or malformed query and `503` when the index
/// is unavailable, so clients can tell "no matches" from "search is down".
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    if params.q.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let index = state.index.as_ref().ok_or_else(|| {
        NoteError::IndexUnavailable("search index failed to open at startup".to_string())
    })?;

    Ok(Json(index.search(&params.q).await?))
}

/// Pick an id for a new note: the explicit `id` if given, else a slug of
/// the header title or the request's `title`, else `note-<unix seconds>`.
fn derive_id(payload: &NotePayload) -> String {
    if let Some(id) = payload.id.as_deref().filter(|id| !id.trim().is_empty()) {
        return id.to_string();
    }

    let (header, _) = split_header(&payload.content);
    let title = header
        .title
        .or_else(|| payload.title.clone())
        .filter(|t| !t.trim().is_empty());

    match title {
        Some(title) => slugify(&title),
        None => format!("note-{}", Utc::now().timestamp()),
    }
}

/// Lowercase and turn spaces into hyphens. Nothing else is stripped, so a
/// title containing `/` yields an id the store rejects.
fn slugify(title: &str) -> String {
    title.trim().to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(id: Option<&str>, title: Option<&str>, content: &str) -> NotePayload {
        NotePayload {
            id: id.map(str::to_string),
            title: title.map(str::to_string),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Weekly Review"), "weekly-review");
        assert_eq!(slugify("  Go  Tips "), "go--tips");
        assert_eq!(slugify("a/b"), "a/b");
    }

    #[test]
    fn test_derive_id_prefers_explicit_id() {
        let p = payload(Some("chosen"), Some("Other"), "---\ntitle: Header\n---\nbody");
        assert_eq!(derive_id(&p), "chosen");
    }

    #[test]
    fn test_derive_id_from_header_then_title() {
        let p = payload(None, Some("Request Title"), "---\ntitle: Header Title\n---\nbody");
        assert_eq!(derive_id(&p), "header-title");

        let p = payload(Some(""), Some("Request Title"), "no header here");
        assert_eq!(derive_id(&p), "request-title");
    }

    #[test]
    fn test_derive_id_timestamp_fallback() {
        let p = payload(None, Some("   "), "just text");
        let id = derive_id(&p);
        let secs = id.strip_prefix("note-").expect("timestamp id");
        assert!(secs.parse::<i64>().is_ok(), "got {id}");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (NoteError::not_found("x"), StatusCode::NOT_FOUND, "not_found"),
            (NoteError::invalid_path("../x"), StatusCode::BAD_REQUEST, "bad_request"),
            (NoteError::invalid_argument("empty"), StatusCode::BAD_REQUEST, "bad_request"),
            (NoteError::QuerySyntax("fts5".into()), StatusCode::BAD_REQUEST, "bad_request"),
            (
                NoteError::IndexUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "search_unavailable",
            ),
            (
                NoteError::Io(std::io::Error::other("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];
        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status, status);
            assert_eq!(app.code, code);
        }
    }
}
