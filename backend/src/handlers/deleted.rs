//! HTTP handlers for the deleted items ledger

use axum::{extract::State, Json};
use chrono::Utc;
use shared::DeletedSkuRecord;

use crate::error::AppResult;
use crate::models::SkuSelection;
use crate::services::session::MutationReport;
use crate::AppState;

/// List ledger entries in deletion order
pub async fn list_deleted(State(state): State<AppState>) -> AppResult<Json<Vec<DeletedSkuRecord>>> {
    let session = state.session.lock().await;
    Ok(Json(session.ledger().entries().to_vec()))
}

/// Restore SKUs, merging into active rows that share the sku
pub async fn restore_deleted(
    State(state): State<AppState>,
    Json(input): Json<SkuSelection>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.restore(input.skus, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Permanently delete SKUs from the ledger
pub async fn purge_deleted(
    State(state): State<AppState>,
    Json(input): Json<SkuSelection>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.purge(input.skus, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Empty the ledger
pub async fn clear_deleted(State(state): State<AppState>) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(|session| Ok(session.clear_deleted(Utc::now())))
        .await?;
    Ok(Json(report))
}
