//! Warehouse Inventory Dashboard - Backend Server
//!
//! Reconciles uploaded stock spreadsheets, keeps a soft-delete ledger of
//! removed SKUs and records every change in an append-only log.

use axum::{routing::get, Router};
use shared::Reconciler;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod services;

pub use config::Config;
use error::{AppError, AppResult};
use services::{InventorySession, InventoryStore, SessionState};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<InventorySession>>,
    pub store: Option<InventoryStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Run one mutation against the session and persist the result.
    /// A failed mutation or save leaves the session as it was.
    pub async fn mutate<T, F>(&self, op: F) -> AppResult<T>
    where
        F: FnOnce(&mut InventorySession) -> AppResult<T>,
    {
        let mut session = self.session.lock().await;
        // Includes the findings of the last reconcile, not just the state
        let before = (*session).clone();

        let out = match op(&mut *session) {
            Ok(out) => out,
            Err(err) => {
                *session = before;
                return Err(err);
            }
        };

        if let Some(store) = &self.store {
            if let Err(err) = store.save_session(session.state()).await {
                tracing::error!("Failed to persist inventory session, rolling back");
                *session = before;
                return Err(err);
            }
        }
        Ok(out)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wid_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Warehouse Inventory Server");
    tracing::info!("Environment: {}", config.environment);

    let schema = config
        .inventory
        .column_schema()
        .map_err(AppError::Configuration)?;
    let reconciler = Reconciler::new(schema);

    let store = match &config.database {
        Some(database) => {
            // Create database connection pool
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&database.url)
                .await?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&db_pool).await?;
            tracing::info!("Migrations completed");

            Some(InventoryStore::new(db_pool))
        }
        None => {
            tracing::warn!("No database configured, inventory is kept in memory only");
            None
        }
    };

    let state = match &store {
        Some(store) => store.load_session().await?,
        None => None,
    }
    .unwrap_or_else(|| SessionState::new(config.inventory.low_stock_threshold));
    tracing::info!(
        "Session loaded: {} active SKU(s), {} deleted item(s)",
        state.active.len(),
        state.ledger.len()
    );

    let session = InventorySession::new(reconciler, config.inventory.location_columns.clone(), state);

    // Create application state
    let app_state = AppState {
        session: Arc::new(Mutex::new(session)),
        store,
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Warehouse Inventory Dashboard API v1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use shared::{InventoryFilter, RawTable};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config {
            environment: "test".to_string(),
            server: crate::config::ServerConfig::default(),
            database: None,
            inventory: crate::config::InventoryConfig::default(),
        };
        let session = InventorySession::new(Reconciler::default(), None, SessionState::new(10));
        AppState {
            session: Arc::new(Mutex::new(session)),
            store: None,
            config: Arc::new(config),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_failed_mutation_rolls_back() {
        let state = test_state();
        let result: AppResult<()> = tokio_test::block_on(state.mutate(|session| {
            session.set_threshold(42)?;
            Err(AppError::Internal("boom".to_string()))
        }));
        assert!(result.is_err());

        let session = tokio_test::block_on(state.session.lock());
        assert_eq!(session.state().low_stock_threshold, 10);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_previous_findings() {
        let state = test_state();
        let duplicated = RawTable::new(["SKU", "QTYAVAILABLE", "R1"])
            .with_row(["A1", "4", "4"])
            .with_row(["A1", "2", "2"]);

        let result: AppResult<()> = state
            .mutate(|session| {
                let report = session.upload(&duplicated, None, chrono::Utc::now())?;
                assert!(!report.warnings.is_empty());
                Err(AppError::Internal("save failed".to_string()))
            })
            .await;
        assert!(result.is_err());

        let session = state.session.lock().await;
        let view = session.view(&InventoryFilter::default());
        assert!(view.records.is_empty());
        assert!(view.warnings.is_empty());
        assert!(view.violations.is_empty());
    }

    #[tokio::test]
    async fn test_csv_upload_then_list() {
        let app = create_app(test_state());

        let upload = Request::builder()
            .method("POST")
            .uri("/api/v1/inventory/upload/csv")
            .body(Body::from("SKU,Description,QTYAVAILABLE,R1,TOTAL\nA1,Bolt,5,5,5\n"))
            .unwrap();
        let response = app.clone().oneshot(upload).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let list = Request::builder()
            .uri("/api/v1/inventory")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(list).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["records"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["records"][0]["sku"], "A1");
    }

    #[tokio::test]
    async fn test_edit_unknown_sku_is_not_found() {
        let app = create_app(test_state());
        let edit = Request::builder()
            .method("PUT")
            .uri("/api/v1/inventory/Z9")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(edit).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_health_without_database() {
        let app = create_app(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["database"], "disabled");
        assert_eq!(body["active_skus"], 0);
    }
}
