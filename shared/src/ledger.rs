//! Soft-delete ledger
//!
//! Rows leaving the active table are captured here with a timestamp until
//! they are restored (re-inserted, or merged into an active row with the
//! same sku) or purged for good. Each mutation appends exactly one
//! [`ChangeLogEntry`].

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChangeAction, ChangeLog, ChangeLogEntry, InventoryRecord, InventoryTable, BULK_SKU};
use crate::reconcile::{LocationViolation, ReconcileWarning, Reconciler};

/// A removed row held for recovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedSkuRecord {
    pub record: InventoryRecord,
    pub deleted_at: DateTime<Utc>,
}

/// Outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreOutcome {
    /// Skus re-inserted verbatim
    pub restored: Vec<String>,
    /// Skus merged into an existing active row
    pub conflicts: BTreeSet<String>,
    /// Requested skus with no ledger entry
    pub not_found: BTreeSet<String>,
    pub warnings: Vec<ReconcileWarning>,
    pub violations: Vec<LocationViolation>,
}

/// Ledger of soft-deleted rows, in deletion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftDeleteLedger {
    entries: Vec<DeletedSkuRecord>,
}

impl SoftDeleteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<DeletedSkuRecord>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DeletedSkuRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.entries.iter().any(|e| e.record.sku == sku)
    }

    /// Capture removed rows. Existing entries for the same sku are kept,
    /// so repeated delete cycles accumulate entries.
    pub fn record_deletion(
        &mut self,
        records: Vec<InventoryRecord>,
        at: DateTime<Utc>,
        log: &mut ChangeLog,
    ) -> Option<ChangeLogEntry> {
        if records.is_empty() {
            return None;
        }
        let skus: Vec<String> = records.iter().map(|r| r.sku.clone()).collect();
        self.entries.extend(
            records
                .into_iter()
                .map(|record| DeletedSkuRecord { record, deleted_at: at }),
        );
        Some(log.record(
            at,
            ChangeAction::Delete,
            subject(&skus),
            describe("Deleted", &skus),
        ))
    }

    /// Bring ledger entries for `skus` back into `active`.
    ///
    /// An entry whose sku is already active is merged by summing every
    /// numeric field; if the entry was flagged deleted the merged row is
    /// forced back to `Deleted`. The whole table is re-reconciled afterwards.
    pub fn restore(
        &mut self,
        skus: &BTreeSet<String>,
        active: &mut InventoryTable,
        reconciler: &Reconciler,
        at: DateTime<Utc>,
        log: &mut ChangeLog,
    ) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();
        let (selected, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| skus.contains(&e.record.sku));
        self.entries = kept;

        outcome.not_found = skus
            .iter()
            .filter(|sku| !selected.iter().any(|e| &e.record.sku == *sku))
            .cloned()
            .collect();
        if selected.is_empty() {
            return outcome;
        }

        let mut touched = Vec::new();
        for entry in selected {
            let sku = entry.record.sku.clone();
            match active.records.iter_mut().find(|r| r.sku == sku) {
                Some(existing) => {
                    merge_into(existing, &entry.record);
                    outcome.conflicts.insert(sku.clone());
                }
                None => {
                    for code in entry.record.location_quantities.keys() {
                        active.ensure_location(code);
                    }
                    active.records.push(entry.record);
                    outcome.restored.push(sku.clone());
                }
            }
            if !touched.contains(&sku) {
                touched.push(sku);
            }
        }

        let reconciled = reconciler.reconcile_table(active);
        *active = reconciled.table;
        outcome.warnings = reconciled.warnings;
        outcome.violations = reconciled.violations;

        let mut description = describe("Restored", &touched);
        if !outcome.conflicts.is_empty() {
            let merged: Vec<&str> = outcome.conflicts.iter().map(String::as_str).collect();
            description.push_str(&format!(" (merged into active: {})", merged.join(", ")));
        }
        log.record(at, ChangeAction::Restore, subject(&touched), description);
        outcome
    }

    /// Permanently drop every entry for `skus`; returns entries removed
    pub fn purge(&mut self, skus: &BTreeSet<String>, at: DateTime<Utc>, log: &mut ChangeLog) -> usize {
        let before = self.entries.len();
        let mut purged: Vec<String> = Vec::new();
        self.entries.retain(|e| {
            let hit = skus.contains(&e.record.sku);
            if hit && !purged.contains(&e.record.sku) {
                purged.push(e.record.sku.clone());
            }
            !hit
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            log.record(
                at,
                ChangeAction::PermanentDelete,
                subject(&purged),
                describe("Permanently deleted", &purged),
            );
        }
        removed
    }

    /// Empty the ledger; returns entries removed
    pub fn clear_all(&mut self, at: DateTime<Utc>, log: &mut ChangeLog) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        if removed > 0 {
            log.record(
                at,
                ChangeAction::ClearDeleted,
                BULK_SKU,
                format!("Cleared {} deleted item(s)", removed),
            );
        }
        removed
    }
}

/// Add a deleted snapshot onto an active row
pub fn merge_into(active: &mut InventoryRecord, deleted: &InventoryRecord) {
    active.total_quantity += deleted.total_quantity;
    active.quantity_on_hold += deleted.quantity_on_hold;
    active.standard_cube += deleted.standard_cube;
    active.quantity_available += deleted.quantity_available;
    for (code, quantity) in &deleted.location_quantities {
        *active.location_quantities.entry(code.clone()).or_default() += *quantity;
    }
    if deleted.deleted_flag == 1 {
        active.mark_deleted();
    }
}

/// Rows present in `previous` but missing from `edited`, counted per sku so
/// that dropping one of two duplicates moves only the later row.
pub fn snapshot_removals(previous: &InventoryTable, edited: &InventoryTable) -> Vec<InventoryRecord> {
    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for record in &edited.records {
        *remaining.entry(record.sku.as_str()).or_insert(0) += 1;
    }
    previous
        .records
        .iter()
        .filter(|record| match remaining.get_mut(record.sku.as_str()) {
            Some(left) if *left > 0 => {
                *left -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Remove every active row carrying one of `skus` and capture it in the ledger
pub fn delete_skus(
    active: &mut InventoryTable,
    skus: &BTreeSet<String>,
    ledger: &mut SoftDeleteLedger,
    at: DateTime<Utc>,
    log: &mut ChangeLog,
) -> Vec<InventoryRecord> {
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut active.records)
        .into_iter()
        .partition(|r| skus.contains(&r.sku));
    active.records = kept;
    ledger.record_deletion(removed.clone(), at, log);
    removed
}

/// Ledger operation requested by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "skus", rename_all = "snake_case")]
pub enum LedgerOp {
    Delete(BTreeSet<String>),
    Restore(BTreeSet<String>),
    Purge(BTreeSet<String>),
    ClearAll,
}

/// State after a ledger operation plus what it logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerResult {
    pub active: InventoryTable,
    pub ledger: SoftDeleteLedger,
    pub entries: Vec<ChangeLogEntry>,
    /// Rows deleted, restored or purged
    pub affected: usize,
    /// Skus that hit the merge path on restore
    pub conflicts: BTreeSet<String>,
    pub not_found: BTreeSet<String>,
    pub warnings: Vec<ReconcileWarning>,
    pub violations: Vec<LocationViolation>,
}

/// Apply one ledger operation to owned state and hand the new state back
pub fn apply_ledger_op(
    op: LedgerOp,
    mut active: InventoryTable,
    mut ledger: SoftDeleteLedger,
    log: &mut ChangeLog,
    reconciler: &Reconciler,
    at: DateTime<Utc>,
) -> LedgerResult {
    let logged_from = log.len();
    let mut conflicts = BTreeSet::new();
    let mut not_found = BTreeSet::new();
    let mut warnings = Vec::new();
    let mut violations = Vec::new();

    let affected = match &op {
        LedgerOp::Delete(skus) => {
            let removed = delete_skus(&mut active, skus, &mut ledger, at, log);
            not_found = skus
                .iter()
                .filter(|sku| !removed.iter().any(|r| &r.sku == *sku))
                .cloned()
                .collect();
            if !removed.is_empty() {
                let reconciled = reconciler.reconcile_table(&active);
                active = reconciled.table;
                warnings = reconciled.warnings;
                violations = reconciled.violations;
            }
            removed.len()
        }
        LedgerOp::Restore(skus) => {
            let before = ledger.len();
            let outcome = ledger.restore(skus, &mut active, reconciler, at, log);
            conflicts = outcome.conflicts;
            not_found = outcome.not_found;
            warnings = outcome.warnings;
            violations = outcome.violations;
            before - ledger.len()
        }
        LedgerOp::Purge(skus) => {
            not_found = skus.iter().filter(|s| !ledger.contains(s)).cloned().collect();
            ledger.purge(skus, at, log)
        }
        LedgerOp::ClearAll => ledger.clear_all(at, log),
    };

    LedgerResult {
        active,
        ledger,
        entries: log.since(logged_from).to_vec(),
        affected,
        conflicts,
        not_found,
        warnings,
        violations,
    }
}

fn subject(skus: &[String]) -> String {
    match skus {
        [single] => single.clone(),
        _ => BULK_SKU.to_string(),
    }
}

fn describe(verb: &str, skus: &[String]) -> String {
    match skus {
        [single] => format!("{} SKU: {}", verb, single),
        _ => format!("{} {} SKU(s): {}", verb, skus.len(), skus.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use rust_decimal::Decimal;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn record(sku: &str, available: i64, total: i64) -> InventoryRecord {
        InventoryRecord {
            quantity_available: dec(available),
            total_quantity: dec(total),
            ..InventoryRecord::new(sku, format!("Item {}", sku))
        }
    }

    fn skus(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_record_deletion_accumulates_duplicates() {
        let mut ledger = SoftDeleteLedger::new();
        let mut log = ChangeLog::new();
        let at = Utc::now();
        ledger.record_deletion(vec![record("A1", 5, 5)], at, &mut log);
        ledger.record_deletion(vec![record("A1", 3, 3)], at, &mut log);
        assert_eq!(ledger.len(), 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].sku, "A1");
        assert_eq!(log.entries()[0].action, ChangeAction::Delete);
    }

    #[test]
    fn test_empty_deletion_logs_nothing() {
        let mut ledger = SoftDeleteLedger::new();
        let mut log = ChangeLog::new();
        assert!(ledger.record_deletion(vec![], Utc::now(), &mut log).is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn test_restore_without_conflict_is_verbatim() {
        let original = record("A100", 5, 5);
        let mut active = InventoryTable::new(vec![], vec![original.clone(), record("B1", 2, 2)]);
        let mut ledger = SoftDeleteLedger::new();
        let mut log = ChangeLog::new();
        let at = Utc::now();

        delete_skus(&mut active, &skus(&["A100"]), &mut ledger, at, &mut log);
        assert!(!active.contains("A100"));

        let outcome = ledger.restore(&skus(&["A100"]), &mut active, &Reconciler::default(), at, &mut log);
        assert_eq!(outcome.restored, vec!["A100".to_string()]);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(active.find("A100"), Some(&original));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_restore_conflict_sums_quantities() {
        let mut active = InventoryTable::new(vec![], vec![record("A100", 10, 10)]);
        let mut ledger = SoftDeleteLedger::from_entries(vec![DeletedSkuRecord {
            record: record("A100", 4, 4).with_location("R1", dec(4)),
            deleted_at: Utc::now(),
        }]);
        let mut log = ChangeLog::new();

        let outcome = ledger.restore(
            &skus(&["A100"]),
            &mut active,
            &Reconciler::default(),
            Utc::now(),
            &mut log,
        );
        assert_eq!(outcome.conflicts, skus(&["A100"]));
        let merged = active.find("A100").unwrap();
        assert_eq!(merged.quantity_available, dec(14));
        assert_eq!(merged.total_quantity, dec(14));
        assert_eq!(merged.quantity_at("R1"), dec(4));
        assert_eq!(merged.status, RecordStatus::Active);
        assert_eq!(active.location_columns, vec!["R1".to_string()]);
        assert!(ledger.is_empty());
        assert!(log.entries()[0].description.contains("merged into active: A100"));
    }

    #[test]
    fn test_restore_conflict_with_deleted_snapshot_deactivates() {
        let mut active = InventoryTable::new(vec![], vec![record("A100", 10, 10)]);
        let mut snapshot = record("A100", 4, 4);
        snapshot.mark_deleted();
        let mut ledger = SoftDeleteLedger::from_entries(vec![DeletedSkuRecord {
            record: snapshot,
            deleted_at: Utc::now(),
        }]);
        let mut log = ChangeLog::new();

        ledger.restore(&skus(&["A100"]), &mut active, &Reconciler::default(), Utc::now(), &mut log);
        let merged = active.find("A100").unwrap();
        assert_eq!(merged.status, RecordStatus::Deleted);
        assert_eq!(merged.deleted_flag, 1);
        assert_eq!(merged.quantity_available, dec(14));
    }

    #[test]
    fn test_restore_unknown_sku_is_reported() {
        let mut active = InventoryTable::default();
        let mut ledger = SoftDeleteLedger::new();
        let mut log = ChangeLog::new();
        let outcome = ledger.restore(&skus(&["Z9"]), &mut active, &Reconciler::default(), Utc::now(), &mut log);
        assert_eq!(outcome.not_found, skus(&["Z9"]));
        assert!(log.is_empty());
    }

    #[test]
    fn test_purge_and_clear() {
        let at = Utc::now();
        let mut log = ChangeLog::new();
        let mut ledger = SoftDeleteLedger::from_entries(
            ["A1", "A1", "B2", "C3"]
                .iter()
                .map(|s| DeletedSkuRecord { record: record(s, 1, 1), deleted_at: at })
                .collect(),
        );
        assert_eq!(ledger.purge(&skus(&["A1"]), at, &mut log), 2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(log.entries()[0].action, ChangeAction::PermanentDelete);
        assert_eq!(log.entries()[0].sku, "A1");

        assert_eq!(ledger.clear_all(at, &mut log), 2);
        assert!(ledger.is_empty());
        let last = log.entries().last().unwrap();
        assert_eq!(last.action, ChangeAction::ClearDeleted);
        assert!(last.is_bulk());
        assert_eq!(last.description, "Cleared 2 deleted item(s)");
    }

    #[test]
    fn test_snapshot_removals_counts_duplicates() {
        let previous = InventoryTable::new(
            vec![],
            vec![record("A1", 1, 1), record("A1", 2, 2), record("B2", 3, 3)],
        );
        let edited = InventoryTable::new(vec![], vec![record("A1", 1, 1)]);
        let removed = snapshot_removals(&previous, &edited);
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].quantity_available, dec(2));
        assert_eq!(removed[1].sku, "B2");
    }

    #[test]
    fn test_apply_ledger_op_reports_entries() {
        let active = InventoryTable::new(vec![], vec![record("A1", 5, 5), record("B2", 5, 5)]);
        let mut log = ChangeLog::new();
        let result = apply_ledger_op(
            LedgerOp::Delete(skus(&["A1", "B2", "C3"])),
            active,
            SoftDeleteLedger::new(),
            &mut log,
            &Reconciler::default(),
            Utc::now(),
        );
        assert_eq!(result.affected, 2);
        assert!(result.active.is_empty());
        assert_eq!(result.ledger.len(), 2);
        assert_eq!(result.not_found, skus(&["C3"]));
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].sku, BULK_SKU);
        assert_eq!(result.entries[0].description, "Deleted 2 SKU(s): A1, B2");
    }
}
