//! Message index handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use mailscan_core::SearchPage;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default = "first_page")]
    page: u32,
}

const fn first_page() -> u32 {
    1
}

pub async fn search_messages(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchPage>> {
    let page = state
        .messages
        .search(params.q.trim(), params.page, state.page_size)
        .await?;
    Ok(Json(page))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let removed = state.messages.delete(&id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id, "removed": removed })))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = state.messages.stats().await?;
    let status = state.orchestrator.monitor().status();
    Ok(Json(json!({
        "total_count": stats.total_count,
        "last_scan_timestamp": status.last_scan_timestamp,
        "last_email_count": status.last_email_count,
        "scanning": status.running,
    })))
}
