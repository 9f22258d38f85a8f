//! HTTP routing.

mod articles;
mod error;
mod messages;
mod scan;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use mailscan_core::{ArticleStore, Credentials, MessageStore, ScanOrchestrator};
use mailscan_extract::{Extractor, PageFetcher};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Extractor over a type-erased fetcher.
pub type SharedExtractor = Arc<Extractor<Arc<dyn PageFetcher>>>;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Starts and observes scans.
    pub orchestrator: ScanOrchestrator,
    /// Message index.
    pub messages: Arc<dyn MessageStore>,
    /// Article store.
    pub articles: Arc<dyn ArticleStore>,
    /// Article extraction engine.
    pub extractor: SharedExtractor,
    /// Account used for scans; `None` when not configured.
    pub credentials: Option<Credentials>,
    /// Folders scanned when a request names none.
    pub default_folders: Vec<String>,
    /// Search results per page.
    pub page_size: u32,
}

impl AppState {
    fn require_credentials(&self) -> ApiResult<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ApiError::unavailable("IMAP credentials are not configured"))
    }
}

/// Builds the `/api` router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/scan", post(scan::start_scan))
        .route("/api/scan-status", get(scan::scan_status))
        .route("/api/scan-progress", get(scan::scan_progress))
        .route("/api/scan-cancel", post(scan::cancel_scan))
        .route("/api/folders", get(scan::list_folders))
        .route("/api/messages", get(messages::search_messages))
        .route("/api/messages/{id}", delete(messages::delete_message))
        .route("/api/stats", get(messages::stats))
        .route(
            "/api/articles",
            post(articles::import_article).get(articles::list_articles),
        )
        .route("/api/articles/stats", get(articles::article_stats))
        .route(
            "/api/articles/{id}",
            get(articles::get_article).delete(articles::delete_article),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
