//! HTTP handlers for the active inventory table

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use shared::{InventoryTable, StockMovement};

use crate::error::AppResult;
use crate::models::{
    CsvUploadQuery, InventoryFilter, MovementQuery, SkuSelection, ThresholdInput, UploadRequest,
};
use crate::services::session::{
    AddRecordInput, EditRecordInput, InventoryOverview, InventoryView, MutationReport,
};
use crate::services::SpreadsheetService;
use crate::AppState;

/// List active rows, optionally filtered
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(filter): Query<InventoryFilter>,
) -> AppResult<Json<InventoryView>> {
    let session = state.session.lock().await;
    Ok(Json(session.view(&filter)))
}

/// Upload a parsed sheet as JSON
pub async fn upload_inventory(
    State(state): State<AppState>,
    Json(input): Json<UploadRequest>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.upload(&input.table, input.location_columns, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Upload a CSV file body
pub async fn upload_inventory_csv(
    State(state): State<AppState>,
    Query(query): Query<CsvUploadQuery>,
    body: String,
) -> AppResult<Json<MutationReport>> {
    let raw = SpreadsheetService::parse_csv(&body)?;
    let hint = query.location_hint();
    let report = state
        .mutate(move |session| session.upload(&raw, hint, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Add a SKU by hand
pub async fn add_record(
    State(state): State<AppState>,
    Json(input): Json<AddRecordInput>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.add_record(input, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Edit one SKU
pub async fn edit_record(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Json(input): Json<EditRecordInput>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.edit_record(&sku, input, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Replace the active table with an edited copy
pub async fn apply_snapshot(
    State(state): State<AppState>,
    Json(edited): Json<InventoryTable>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.apply_snapshot(edited, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Move SKUs to the deleted items ledger
pub async fn delete_records(
    State(state): State<AppState>,
    Json(input): Json<SkuSelection>,
) -> AppResult<Json<MutationReport>> {
    let report = state
        .mutate(move |session| session.delete(input.skus, Utc::now()))
        .await?;
    Ok(Json(report))
}

/// Export the active table as CSV
pub async fn export_inventory(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let session = state.session.lock().await;
    let csv = SpreadsheetService::export_to_csv(session.active())?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"inventory.csv\"",
            ),
        ],
        csv,
    ))
}

/// KPI cards and low stock alerts
pub async fn get_overview(State(state): State<AppState>) -> AppResult<Json<InventoryOverview>> {
    let session = state.session.lock().await;
    Ok(Json(session.overview()))
}

/// Change the low stock threshold
pub async fn set_threshold(
    State(state): State<AppState>,
    Json(input): Json<ThresholdInput>,
) -> AppResult<Json<InventoryOverview>> {
    state
        .mutate(move |session| session.set_threshold(input.threshold))
        .await?;
    let session = state.session.lock().await;
    Ok(Json(session.overview()))
}

/// Stock movement history, optionally for one SKU
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let session = state.session.lock().await;
    Ok(Json(session.movements(query.sku.as_deref())))
}
