//! HTTP handlers for the change log

use axum::{extract::State, Json};
use serde::Serialize;
use shared::ChangeLogEntry;

use crate::error::AppResult;
use crate::AppState;

#[derive(Serialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

/// Change log, newest first
pub async fn list_logs(State(state): State<AppState>) -> AppResult<Json<Vec<ChangeLogEntry>>> {
    let session = state.session.lock().await;
    Ok(Json(session.log().entries().iter().rev().cloned().collect()))
}

/// Wipe the change log
pub async fn clear_logs(State(state): State<AppState>) -> AppResult<Json<ClearedResponse>> {
    let cleared = state.mutate(|session| Ok(session.clear_logs())).await?;
    Ok(Json(ClearedResponse { cleared }))
}
