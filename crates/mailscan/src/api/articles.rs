//! Article import and retrieval handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use mailscan_core::{ArticleStats, StoredArticle};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ImportArticle {
    id: String,
    url: String,
}

pub async fn import_article(
    State(state): State<AppState>,
    Json(body): Json<ImportArticle>,
) -> ApiResult<(StatusCode, Json<StoredArticle>)> {
    let id = body.id.trim();
    if id.is_empty() {
        return Err(ApiError::bad_request("article id is required"));
    }

    let result = state.extractor.extract(body.url.trim()).await?;
    let stored = state.articles.put(id, body.url.trim(), &result).await?;
    info!("Imported article {} from {}", stored.id, stored.domain);
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn list_articles(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let ids = state.articles.list_ids().await?;
    Ok(Json(json!({ "ids": ids })))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StoredArticle>> {
    state
        .articles
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("article {id} not found")))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let removed = state.articles.delete(&id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id, "removed": removed })))
}

pub async fn article_stats(State(state): State<AppState>) -> ApiResult<Json<ArticleStats>> {
    Ok(Json(state.articles.stats().await?))
}
