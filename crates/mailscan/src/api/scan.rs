//! Scan lifecycle handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use mailscan_core::{CancelOutcome, ScanProgress, ScanRequest, ScanStatus};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct StartScanBody {
    #[serde(default)]
    folders: Vec<String>,
}

pub async fn start_scan(
    State(state): State<AppState>,
    body: Option<Json<StartScanBody>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let credentials = state.require_credentials()?.clone();
    let folders = body
        .map(|Json(body)| body.folders)
        .filter(|folders| !folders.is_empty())
        .unwrap_or_else(|| state.default_folders.clone());

    let accepted = state
        .orchestrator
        .start(ScanRequest::new(credentials).with_folders(folders))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "started", "folders": accepted.folders })),
    ))
}

pub async fn scan_status(State(state): State<AppState>) -> Json<ScanStatus> {
    Json(state.orchestrator.monitor().status())
}

pub async fn scan_progress(State(state): State<AppState>) -> Json<ScanProgress> {
    Json(state.orchestrator.monitor().progress())
}

pub async fn cancel_scan(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    match state.orchestrator.monitor().request_cancel() {
        CancelOutcome::Requested => {
            info!("Scan cancellation requested");
            Ok(Json(json!({ "status": "cancelling" })))
        }
        CancelOutcome::AlreadyPending => Ok(Json(json!({ "status": "cancelling" }))),
        CancelOutcome::NotRunning => Err(ApiError::bad_request("no scan is running")),
    }
}

pub async fn list_folders(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let credentials = state.require_credentials()?;
    let folders = state.orchestrator.list_folders(credentials).await?;
    Ok(Json(json!({ "folders": folders })))
}
