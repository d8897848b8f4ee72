//! Route definitions for the Warehouse Inventory Dashboard

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Active inventory
        .nest("/inventory", inventory_routes())
        // Soft-deleted items
        .nest("/deleted", deleted_routes())
        // Change log
        .route("/logs", get(handlers::list_logs).delete(handlers::clear_logs))
}

/// Active inventory routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_inventory)
                .post(handlers::add_record)
                .put(handlers::apply_snapshot),
        )
        .route("/upload", post(handlers::upload_inventory))
        .route("/upload/csv", post(handlers::upload_inventory_csv))
        .route("/delete", post(handlers::delete_records))
        .route("/export", get(handlers::export_inventory))
        .route("/overview", get(handlers::get_overview))
        .route("/threshold", put(handlers::set_threshold))
        .route("/movements", get(handlers::list_movements))
        .route("/:sku", put(handlers::edit_record))
}

/// Deleted items ledger routes
fn deleted_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_deleted).delete(handlers::clear_deleted),
        )
        .route("/restore", post(handlers::restore_deleted))
        .route("/purge", post(handlers::purge_deleted))
}
