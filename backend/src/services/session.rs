//! Inventory session service
//!
//! Owns the state of one interactive session (active table, soft-delete
//! ledger, change log, stock movements and settings) and applies every
//! user action to it through the shared reconcile and ledger core.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    apply_ledger_op, compute_kpis, low_stock_alerts, snapshot_removals, validate_location_code,
    validate_low_stock_threshold, validate_quantity, validate_sku, ChangeAction, ChangeLog,
    ChangeLogEntry, InventoryFilter, InventoryKpis, InventoryRecord, InventoryTable, LedgerOp,
    LocationViolation, RawTable, ReconcileResult, ReconcileWarning, Reconciler, RecordStatus,
    SoftDeleteLedger, StockMovement, BULK_SKU,
};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Everything that is persisted between requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub active: InventoryTable,
    pub ledger: SoftDeleteLedger,
    pub log: ChangeLog,
    pub movements: Vec<StockMovement>,
    pub low_stock_threshold: u32,
}

impl SessionState {
    pub fn new(low_stock_threshold: u32) -> Self {
        Self {
            active: InventoryTable::default(),
            ledger: SoftDeleteLedger::new(),
            log: ChangeLog::new(),
            movements: Vec::new(),
            low_stock_threshold,
        }
    }
}

/// Input for adding a SKU by hand
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddRecordInput {
    #[validate(custom = "sku_field")]
    pub sku: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub quantity_on_hold: Decimal,
    #[serde(default)]
    pub standard_cube: Decimal,
    #[serde(default)]
    pub quantity_available: Decimal,
    #[serde(default)]
    pub location_quantities: BTreeMap<String, Decimal>,
    /// Left blank to derive from the location quantities
    pub total_quantity: Option<Decimal>,
}

/// Partial update of one SKU; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditRecordInput {
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub quantity_on_hold: Option<Decimal>,
    pub standard_cube: Option<Decimal>,
    pub quantity_available: Option<Decimal>,
    /// Replaces the listed locations only
    pub location_quantities: Option<BTreeMap<String, Decimal>>,
    pub total_quantity: Option<Decimal>,
    pub status: Option<RecordStatus>,
}

fn sku_field(sku: &str) -> Result<(), ValidationError> {
    validate_sku(sku).map_err(|message| {
        let mut error = ValidationError::new("sku");
        error.message = Some(message.into());
        error
    })
}

/// What a mutation did, returned to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationReport {
    /// Rows loaded, added, edited, deleted, restored or purged
    pub affected: usize,
    /// Active rows moved to the ledger as a side effect
    pub moved_to_ledger: usize,
    pub conflicts: BTreeSet<String>,
    pub not_found: BTreeSet<String>,
    pub warnings: Vec<ReconcileWarning>,
    pub violations: Vec<LocationViolation>,
    pub entries: Vec<ChangeLogEntry>,
}

/// Overview tab payload
#[derive(Debug, Clone, Serialize)]
pub struct InventoryOverview {
    pub threshold: u32,
    pub kpis: InventoryKpis,
    pub low_stock: Vec<InventoryRecord>,
}

/// Active table view with the findings of the last reconcile
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    pub location_columns: Vec<String>,
    pub records: Vec<InventoryRecord>,
    pub warnings: Vec<ReconcileWarning>,
    pub violations: Vec<LocationViolation>,
}

/// One interactive session over the inventory
#[derive(Debug, Clone)]
pub struct InventorySession {
    reconciler: Reconciler,
    location_hint: Option<Vec<String>>,
    state: SessionState,
    last_warnings: Vec<ReconcileWarning>,
    last_violations: Vec<LocationViolation>,
}

impl InventorySession {
    pub fn new(reconciler: Reconciler, location_hint: Option<Vec<String>>, state: SessionState) -> Self {
        let mut session = Self {
            reconciler,
            location_hint,
            state,
            last_warnings: Vec::new(),
            last_violations: Vec::new(),
        };
        let result = session.reconciler.reconcile_table(&session.state.active);
        session.last_warnings = result.warnings;
        session.last_violations = result.violations;
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active(&self) -> &InventoryTable {
        &self.state.active
    }

    pub fn ledger(&self) -> &SoftDeleteLedger {
        &self.state.ledger
    }

    pub fn log(&self) -> &ChangeLog {
        &self.state.log
    }

    pub fn movements(&self, sku: Option<&str>) -> Vec<StockMovement> {
        self.state
            .movements
            .iter()
            .filter(|m| sku.map_or(true, |s| m.sku == s))
            .cloned()
            .collect()
    }

    pub fn view(&self, filter: &InventoryFilter) -> InventoryView {
        InventoryView {
            location_columns: self.state.active.location_columns.clone(),
            records: filter.apply(&self.state.active),
            warnings: self.last_warnings.clone(),
            violations: self.last_violations.clone(),
        }
    }

    pub fn overview(&self) -> InventoryOverview {
        let threshold = self.state.low_stock_threshold;
        InventoryOverview {
            threshold,
            kpis: compute_kpis(&self.state.active, threshold, self.state.ledger.len()),
            low_stock: low_stock_alerts(&self.state.active, threshold),
        }
    }

    /// Replace the active table with a reconciled upload. Active rows that
    /// the upload no longer carries are moved to the ledger first.
    pub fn upload(
        &mut self,
        raw: &RawTable,
        location_hint: Option<Vec<String>>,
        at: DateTime<Utc>,
    ) -> AppResult<MutationReport> {
        let hint = location_hint.or_else(|| self.location_hint.clone());
        let result = self.reconciler.reconcile(raw, hint.as_deref())?;
        let logged_from = self.state.log.len();

        // Counted per sku, so surplus duplicate rows enter the ledger too
        let omitted = snapshot_removals(&self.state.active, &result.table);
        let moved_to_ledger = omitted.len();
        self.state
            .ledger
            .record_deletion(omitted, at, &mut self.state.log);

        let rows = result.table.len();
        self.state.log.record(
            at,
            ChangeAction::Upload,
            BULK_SKU,
            format!(
                "Uploaded {} SKU(s) across {} location(s)",
                rows,
                result.table.location_columns.len()
            ),
        );

        tracing::info!(
            rows,
            moved_to_ledger,
            warnings = result.warnings.len(),
            violations = result.violations.len(),
            "Inventory upload reconciled"
        );

        let mut report = self.accept(result, logged_from);
        report.affected = rows;
        report.moved_to_ledger = moved_to_ledger;
        Ok(report)
    }

    pub fn add_record(&mut self, input: AddRecordInput, at: DateTime<Utc>) -> AppResult<MutationReport> {
        input.validate()?;
        let sku = input.sku.trim().to_string();
        if self.state.active.contains(&sku) {
            return Err(AppError::DuplicateEntry(sku));
        }
        check_quantities(
            [
                ("quantity_on_hold", Some(input.quantity_on_hold)),
                ("standard_cube", Some(input.standard_cube)),
                ("quantity_available", Some(input.quantity_available)),
                ("total_quantity", input.total_quantity),
            ],
            Some(&input.location_quantities),
        )?;

        let mut record = InventoryRecord {
            quantity_on_hold: input.quantity_on_hold,
            standard_cube: input.standard_cube,
            quantity_available: input.quantity_available,
            location_quantities: input.location_quantities,
            ..InventoryRecord::new(sku.clone(), input.description.trim())
        };
        record.total_quantity = input.total_quantity.unwrap_or_default();

        let mut table = self.state.active.clone();
        for code in record.location_quantities.keys() {
            table.ensure_location(code);
        }
        let available = record.quantity_available;
        table.records.push(record);
        let backfill: BTreeSet<usize> = if input.total_quantity.is_none() {
            BTreeSet::from([table.len() - 1])
        } else {
            BTreeSet::new()
        };

        let logged_from = self.state.log.len();
        let result = self.reconciler.reconcile_table_with(&table, &backfill);
        self.state.log.record(
            at,
            ChangeAction::Add,
            sku.clone(),
            format!("Added new SKU: {} (available {})", sku, available),
        );
        if let Some(movement) = StockMovement::between(&sku, Decimal::ZERO, available, at) {
            self.state.movements.push(movement);
        }

        tracing::info!("Added SKU {}", sku);
        let mut report = self.accept(result, logged_from);
        report.affected = 1;
        Ok(report)
    }

    /// Edit the first active row with this sku. Changing location
    /// quantities without a total makes the total derive from them again.
    pub fn edit_record(
        &mut self,
        sku: &str,
        input: EditRecordInput,
        at: DateTime<Utc>,
    ) -> AppResult<MutationReport> {
        input.validate()?;
        let index = self
            .state
            .active
            .position(sku)
            .ok_or_else(|| AppError::NotFound(format!("SKU {}", sku)))?;
        check_quantities(
            [
                ("quantity_on_hold", input.quantity_on_hold),
                ("standard_cube", input.standard_cube),
                ("quantity_available", input.quantity_available),
                ("total_quantity", input.total_quantity),
            ],
            input.location_quantities.as_ref(),
        )?;

        let mut table = self.state.active.clone();
        let previous_available = table.records[index].quantity_available;
        let mut backfill = BTreeSet::new();
        let mut changes = Vec::new();

        if let Some(locations) = &input.location_quantities {
            for code in locations.keys() {
                table.ensure_location(code);
            }
        }

        let record = &mut table.records[index];
        if let Some(description) = input.description {
            record.description = description.trim().to_string();
            changes.push("description".to_string());
        }
        if let Some(value) = input.quantity_on_hold {
            record.quantity_on_hold = value;
            changes.push(format!("on hold {}", value));
        }
        if let Some(value) = input.standard_cube {
            record.standard_cube = value;
            changes.push(format!("cube {}", value));
        }
        if let Some(value) = input.quantity_available {
            record.quantity_available = value;
            changes.push(format!("available {} -> {}", previous_available, value));
        }
        if let Some(locations) = input.location_quantities {
            for (code, quantity) in locations {
                changes.push(format!("{} {}", code, quantity));
                record.location_quantities.insert(code, quantity);
            }
            if input.total_quantity.is_none() {
                backfill.insert(index);
            }
        }
        if let Some(value) = input.total_quantity {
            record.total_quantity = value;
            changes.push(format!("total {}", value));
        }
        match input.status {
            Some(RecordStatus::Deleted) => {
                record.mark_deleted();
                changes.push("status Deleted".to_string());
            }
            Some(RecordStatus::Active) => {
                record.mark_active();
                changes.push("status Active".to_string());
            }
            None => {}
        }
        let current_available = record.quantity_available;

        let logged_from = self.state.log.len();
        let result = self.reconciler.reconcile_table_with(&table, &backfill);
        let description = if changes.is_empty() {
            format!("Edited SKU: {}", sku)
        } else {
            format!("Edited SKU: {} ({})", sku, changes.join(", "))
        };
        self.state.log.record(at, ChangeAction::Edit, sku, description);
        if let Some(movement) = StockMovement::between(sku, previous_available, current_available, at) {
            self.state.movements.push(movement);
        }

        tracing::info!("Edited SKU {}", sku);
        let mut report = self.accept(result, logged_from);
        report.affected = 1;
        Ok(report)
    }

    /// Take an edited copy of the whole table. Rows missing from it move to
    /// the ledger; rows whose locations changed while the total did not get
    /// their total derived again.
    pub fn apply_snapshot(&mut self, edited: InventoryTable, at: DateTime<Utc>) -> AppResult<MutationReport> {
        // Only skus typed into the grid are checked; blank rows are left
        // for reconcile to drop with a warning
        if let Some(record) = edited.records.iter().find(|r| {
            let sku = r.sku.trim();
            !sku.is_empty() && !self.state.active.contains(sku) && validate_sku(sku).is_err()
        }) {
            return Err(AppError::validation(
                "sku",
                format!("Invalid SKU '{}' in edited table", record.sku),
            ));
        }

        let removed = snapshot_removals(&self.state.active, &edited);
        let moved_to_ledger = removed.len();
        let logged_from = self.state.log.len();
        self.state
            .ledger
            .record_deletion(removed, at, &mut self.state.log);

        let backfill: BTreeSet<usize> = edited
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                self.state.active.find(&record.sku).map_or(false, |before| {
                    before.location_quantities != record.location_quantities
                        && before.total_quantity == record.total_quantity
                })
            })
            .map(|(index, _)| index)
            .collect();

        let result = self.reconciler.reconcile_table_with(&edited, &backfill);
        let changed = result.table != self.state.active || moved_to_ledger > 0;
        if result.table != self.state.active {
            self.state.log.record(
                at,
                ChangeAction::Edit,
                BULK_SKU,
                format!("Edited inventory table: {} SKU(s)", result.table.len()),
            );
        }

        if changed {
            tracing::info!(moved_to_ledger, "Applied edited inventory snapshot");
        }
        let mut report = self.accept(result, logged_from);
        report.affected = edited.records.len();
        report.moved_to_ledger = moved_to_ledger;
        Ok(report)
    }

    pub fn delete(&mut self, skus: BTreeSet<String>, at: DateTime<Utc>) -> AppResult<MutationReport> {
        require_skus(&skus)?;
        Ok(self.run_ledger_op(LedgerOp::Delete(skus), at))
    }

    pub fn restore(&mut self, skus: BTreeSet<String>, at: DateTime<Utc>) -> AppResult<MutationReport> {
        require_skus(&skus)?;
        Ok(self.run_ledger_op(LedgerOp::Restore(skus), at))
    }

    pub fn purge(&mut self, skus: BTreeSet<String>, at: DateTime<Utc>) -> AppResult<MutationReport> {
        require_skus(&skus)?;
        Ok(self.run_ledger_op(LedgerOp::Purge(skus), at))
    }

    pub fn clear_deleted(&mut self, at: DateTime<Utc>) -> MutationReport {
        self.run_ledger_op(LedgerOp::ClearAll, at)
    }

    /// Admin wipe of the change log; returns entries dropped
    pub fn clear_logs(&mut self) -> usize {
        let cleared = self.state.log.clear();
        tracing::warn!("Cleared {} change log entries", cleared);
        cleared
    }

    pub fn set_threshold(&mut self, threshold: u32) -> AppResult<()> {
        validate_low_stock_threshold(threshold)
            .map_err(|message| AppError::validation("threshold", message))?;
        self.state.low_stock_threshold = threshold;
        Ok(())
    }

    fn run_ledger_op(&mut self, op: LedgerOp, at: DateTime<Utc>) -> MutationReport {
        let action = match &op {
            LedgerOp::Delete(_) => "delete",
            LedgerOp::Restore(_) => "restore",
            LedgerOp::Purge(_) => "purge",
            LedgerOp::ClearAll => "clear",
        };
        let result = apply_ledger_op(
            op,
            std::mem::take(&mut self.state.active),
            std::mem::take(&mut self.state.ledger),
            &mut self.state.log,
            &self.reconciler,
            at,
        );
        self.state.active = result.active;
        self.state.ledger = result.ledger;

        // Purge and clear leave the active table alone
        if matches!(action, "delete" | "restore") && result.affected > 0 {
            self.last_warnings = result.warnings.clone();
            self.last_violations = result.violations.clone();
        }

        tracing::info!(
            action,
            affected = result.affected,
            conflicts = result.conflicts.len(),
            not_found = result.not_found.len(),
            "Ledger operation applied"
        );

        MutationReport {
            affected: result.affected,
            moved_to_ledger: 0,
            conflicts: result.conflicts,
            not_found: result.not_found,
            warnings: result.warnings,
            violations: result.violations,
            entries: result.entries,
        }
    }

    /// Install a reconciled table as the active one
    fn accept(&mut self, result: ReconcileResult, logged_from: usize) -> MutationReport {
        for warning in &result.warnings {
            tracing::debug!("Reconcile: {}", warning);
        }
        self.state.active = result.table;
        self.last_warnings = result.warnings.clone();
        self.last_violations = result.violations.clone();
        MutationReport {
            warnings: result.warnings,
            violations: result.violations,
            entries: self.state.log.since(logged_from).to_vec(),
            ..MutationReport::default()
        }
    }
}

fn require_skus(skus: &BTreeSet<String>) -> AppResult<()> {
    if skus.is_empty() {
        return Err(AppError::validation("skus", "At least one SKU is required"));
    }
    Ok(())
}

fn check_quantities<const N: usize>(
    fields: [(&str, Option<Decimal>); N],
    locations: Option<&BTreeMap<String, Decimal>>,
) -> AppResult<()> {
    for (field, value) in fields {
        if let Some(value) = value {
            validate_quantity(value).map_err(|message| AppError::validation(field, message))?;
        }
    }
    if let Some(locations) = locations {
        for (code, quantity) in locations {
            validate_location_code(code)
                .and_then(|_| validate_quantity(*quantity))
                .map_err(|message| AppError::validation("location_quantities", message))?;
        }
    }
    Ok(())
}
