//! PostgreSQL persistence for the inventory session
//!
//! The whole session is rewritten on every save inside one transaction, so
//! the active table, ledger and change log can never disagree on disk.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    ChangeAction, ChangeLog, ChangeLogEntry, DeletedSkuRecord, InventoryRecord, InventoryTable,
    MovementDirection, RecordStatus, SoftDeleteLedger, StockMovement,
};
use sqlx::{types::Json, FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::services::session::SessionState;

/// Session store backed by PostgreSQL
#[derive(Clone)]
pub struct InventoryStore {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    low_stock_threshold: i32,
    location_columns: Json<Vec<String>>,
}

#[derive(Debug, FromRow)]
struct RecordRow {
    sku: String,
    description: String,
    quantity_on_hold: Decimal,
    standard_cube: Decimal,
    quantity_available: Decimal,
    location_quantities: Json<BTreeMap<String, Decimal>>,
    total_quantity: Decimal,
    status: String,
    deleted_flag: i16,
}

#[derive(Debug, FromRow)]
struct DeletedRow {
    record: Json<InventoryRecord>,
    deleted_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct LogRow {
    logged_at: DateTime<Utc>,
    action: String,
    sku: String,
    description: String,
}

#[derive(Debug, FromRow)]
struct MovementRow {
    sku: String,
    direction: String,
    quantity_change: Decimal,
    current_quantity: Decimal,
    moved_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for InventoryRecord {
    type Error = AppError;

    fn try_from(row: RecordRow) -> AppResult<Self> {
        let status = RecordStatus::parse(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown record status '{}'", row.status)))?;
        Ok(InventoryRecord {
            sku: row.sku,
            description: row.description,
            quantity_on_hold: row.quantity_on_hold,
            standard_cube: row.standard_cube,
            quantity_available: row.quantity_available,
            location_quantities: row.location_quantities.0,
            total_quantity: row.total_quantity,
            status,
            deleted_flag: u8::from(row.deleted_flag != 0),
        })
    }
}

impl TryFrom<LogRow> for ChangeLogEntry {
    type Error = AppError;

    fn try_from(row: LogRow) -> AppResult<Self> {
        let action = ChangeAction::parse(&row.action)
            .ok_or_else(|| AppError::Internal(format!("Unknown change action '{}'", row.action)))?;
        Ok(ChangeLogEntry::new(row.logged_at, action, row.sku, row.description))
    }
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        let direction = match row.direction.as_str() {
            "in" => MovementDirection::In,
            "out" => MovementDirection::Out,
            other => {
                return Err(AppError::Internal(format!(
                    "Unknown movement direction '{}'",
                    other
                )))
            }
        };
        Ok(StockMovement {
            sku: row.sku,
            direction,
            quantity_change: row.quantity_change,
            current_quantity: row.current_quantity,
            at: row.moved_at,
        })
    }
}

fn position(index: usize) -> AppResult<i32> {
    i32::try_from(index).map_err(|_| AppError::Internal("Too many rows to persist".to_string()))
}

impl InventoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Whether the database answers
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db).await.is_ok()
    }

    /// Load the saved session, `None` when nothing was saved yet
    pub async fn load_session(&self) -> AppResult<Option<SessionState>> {
        let settings = sqlx::query_as::<_, SettingsRow>(
            "SELECT low_stock_threshold, location_columns FROM inventory_settings WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await?;

        let Some(settings) = settings else {
            return Ok(None);
        };

        let records = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT sku, description, quantity_on_hold, standard_cube, quantity_available,
                   location_quantities, total_quantity, status, deleted_flag
            FROM inventory_records
            ORDER BY position
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(InventoryRecord::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let deleted = sqlx::query_as::<_, DeletedRow>(
            "SELECT record, deleted_at FROM deleted_skus ORDER BY position",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| DeletedSkuRecord {
            record: row.record.0,
            deleted_at: row.deleted_at,
        })
        .collect();

        let entries = sqlx::query_as::<_, LogRow>(
            "SELECT logged_at, action, sku, description FROM change_log ORDER BY position",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(ChangeLogEntry::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let movements = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT sku, direction, quantity_change, current_quantity, moved_at
            FROM stock_movements
            ORDER BY position
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StockMovement::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let low_stock_threshold = u32::try_from(settings.low_stock_threshold).map_err(|_| {
            AppError::Internal("Stored low stock threshold is negative".to_string())
        })?;

        Ok(Some(SessionState {
            active: InventoryTable::new(settings.location_columns.0, records),
            ledger: SoftDeleteLedger::from_entries(deleted),
            log: ChangeLog::from_entries(entries),
            movements,
            low_stock_threshold,
        }))
    }

    /// Replace the stored session with `state` in a single transaction
    pub async fn save_session(&self, state: &SessionState) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM inventory_records")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM deleted_skus")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM change_log")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM stock_movements")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO inventory_settings (id, low_stock_threshold, location_columns, updated_at)
            VALUES (1, $1, $2, NOW())
            ON CONFLICT (id) DO UPDATE
            SET low_stock_threshold = EXCLUDED.low_stock_threshold,
                location_columns = EXCLUDED.location_columns,
                updated_at = NOW()
            "#,
        )
        .bind(state.low_stock_threshold as i32)
        .bind(Json(&state.active.location_columns))
        .execute(&mut *tx)
        .await?;

        for (index, record) in state.active.records.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO inventory_records (
                    position, sku, description, quantity_on_hold, standard_cube,
                    quantity_available, location_quantities, total_quantity, status, deleted_flag
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(position(index)?)
            .bind(&record.sku)
            .bind(&record.description)
            .bind(record.quantity_on_hold)
            .bind(record.standard_cube)
            .bind(record.quantity_available)
            .bind(Json(&record.location_quantities))
            .bind(record.total_quantity)
            .bind(record.status.as_str())
            .bind(i16::from(record.deleted_flag))
            .execute(&mut *tx)
            .await?;
        }

        for (index, entry) in state.ledger.entries().iter().enumerate() {
            sqlx::query(
                "INSERT INTO deleted_skus (position, sku, record, deleted_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(position(index)?)
            .bind(&entry.record.sku)
            .bind(Json(&entry.record))
            .bind(entry.deleted_at)
            .execute(&mut *tx)
            .await?;
        }

        for (index, entry) in state.log.entries().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO change_log (position, logged_at, action, sku, description)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(position(index)?)
            .bind(entry.timestamp)
            .bind(entry.action.as_str())
            .bind(&entry.sku)
            .bind(&entry.description)
            .execute(&mut *tx)
            .await?;
        }

        for (index, movement) in state.movements.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO stock_movements (
                    position, sku, direction, quantity_change, current_quantity, moved_at
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(position(index)?)
            .bind(&movement.sku)
            .bind(movement.direction.as_str())
            .bind(movement.quantity_change)
            .bind(movement.current_quantity)
            .bind(movement.at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            records = state.active.len(),
            deleted = state.ledger.len(),
            log_entries = state.log.len(),
            "Inventory session saved"
        );
        Ok(())
    }
}
