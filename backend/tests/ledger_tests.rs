//! Soft-delete ledger tests
//!
//! Tests for deleted item handling including:
//! - Delete then restore round trip
//! - Conflict merge on restore
//! - Purge and clear-all
//! - One change log entry per ledger mutation

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_ledger_op, delete_skus, ChangeAction, ChangeLog, DeletedSkuRecord, InventoryRecord,
    InventoryTable, LedgerOp, Reconciler, RecordStatus, SoftDeleteLedger, BULK_SKU,
};
use std::collections::{BTreeMap, BTreeSet};

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

fn record(sku: &str, available: i64) -> InventoryRecord {
    InventoryRecord {
        quantity_available: dec(available),
        total_quantity: dec(available),
        ..InventoryRecord::new(sku, format!("Item {}", sku))
    }
    .with_location("R1", dec(available))
}

fn skus(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Deleting A100 (qty 5) and restoring it gives the original row back
    #[test]
    fn test_restore_round_trip() {
        let original = record("A100", 5);
        let mut log = ChangeLog::new();
        let deleted = apply_ledger_op(
            LedgerOp::Delete(skus(&["A100"])),
            InventoryTable::new(vec!["R1".to_string()], vec![original.clone()]),
            SoftDeleteLedger::new(),
            &mut log,
            &Reconciler::default(),
            at(),
        );
        assert!(deleted.active.is_empty());
        assert_eq!(deleted.ledger.len(), 1);
        assert_eq!(deleted.ledger.entries()[0].deleted_at, at());

        let restored = apply_ledger_op(
            LedgerOp::Restore(skus(&["A100"])),
            deleted.active,
            deleted.ledger,
            &mut log,
            &Reconciler::default(),
            at(),
        );
        assert_eq!(restored.active.records, vec![original]);
        assert!(restored.ledger.is_empty());
        assert!(restored.conflicts.is_empty());
        assert_eq!(log.len(), 2);
    }

    /// Active 10 plus ledger 4 merges to 14
    #[test]
    fn test_restore_conflict_merges() {
        let mut log = ChangeLog::new();
        let ledger = SoftDeleteLedger::from_entries(vec![DeletedSkuRecord {
            record: record("A100", 4),
            deleted_at: at(),
        }]);
        let result = apply_ledger_op(
            LedgerOp::Restore(skus(&["A100"])),
            InventoryTable::new(vec!["R1".to_string()], vec![record("A100", 10)]),
            ledger,
            &mut log,
            &Reconciler::default(),
            at(),
        );

        let merged = result.active.find("A100").unwrap();
        assert_eq!(merged.quantity_available, dec(14));
        assert_eq!(merged.total_quantity, dec(14));
        assert_eq!(merged.quantity_at("R1"), dec(14));
        assert_eq!(result.active.len(), 1);
        assert!(result.ledger.is_empty());
        assert_eq!(result.conflicts, skus(&["A100"]));
    }

    /// A deleted snapshot merged into an active row deactivates it
    #[test]
    fn test_restore_conflict_with_deleted_flag() {
        let mut snapshot = record("A100", 4);
        snapshot.mark_deleted();
        let mut log = ChangeLog::new();
        let result = apply_ledger_op(
            LedgerOp::Restore(skus(&["A100"])),
            InventoryTable::new(vec!["R1".to_string()], vec![record("A100", 10)]),
            SoftDeleteLedger::from_entries(vec![DeletedSkuRecord {
                record: snapshot,
                deleted_at: at(),
            }]),
            &mut log,
            &Reconciler::default(),
            at(),
        );

        let merged = result.active.find("A100").unwrap();
        assert_eq!(merged.status, RecordStatus::Deleted);
        assert_eq!(merged.deleted_flag, 1);
    }

    /// Bulk actions log once under the sentinel sku
    #[test]
    fn test_bulk_delete_logs_single_entry() {
        let mut log = ChangeLog::new();
        let result = apply_ledger_op(
            LedgerOp::Delete(skus(&["A1", "B2", "C3"])),
            InventoryTable::new(
                vec!["R1".to_string()],
                vec![record("A1", 1), record("B2", 2), record("C3", 3)],
            ),
            SoftDeleteLedger::new(),
            &mut log,
            &Reconciler::default(),
            at(),
        );
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].sku, BULK_SKU);
        assert_eq!(result.entries[0].action, ChangeAction::Delete);
        assert_eq!(result.affected, 3);
    }

    /// Repeated delete cycles accumulate ledger rows for one sku
    #[test]
    fn test_duplicate_ledger_entries_accumulate() {
        let mut active = InventoryTable::new(vec!["R1".to_string()], vec![record("A1", 3)]);
        let mut ledger = SoftDeleteLedger::new();
        let mut log = ChangeLog::new();

        delete_skus(&mut active, &skus(&["A1"]), &mut ledger, at(), &mut log);
        active.records.push(record("A1", 3));
        delete_skus(&mut active, &skus(&["A1"]), &mut ledger, at(), &mut log);
        assert_eq!(ledger.len(), 2);

        // Restoring merges the second entry onto the first
        let outcome = ledger.restore(&skus(&["A1"]), &mut active, &Reconciler::default(), at(), &mut log);
        assert_eq!(active.find("A1").unwrap().quantity_available, dec(6));
        assert_eq!(outcome.restored, vec!["A1".to_string()]);
        assert_eq!(outcome.conflicts, skus(&["A1"]));
    }

    /// Purge and clear-all are terminal
    #[test]
    fn test_purge_then_clear() {
        let mut log = ChangeLog::new();
        let ledger = SoftDeleteLedger::from_entries(
            ["A1", "B2", "B2"]
                .iter()
                .map(|sku| DeletedSkuRecord {
                    record: record(sku, 1),
                    deleted_at: at(),
                })
                .collect(),
        );
        let purged = apply_ledger_op(
            LedgerOp::Purge(skus(&["B2", "Z9"])),
            InventoryTable::default(),
            ledger,
            &mut log,
            &Reconciler::default(),
            at(),
        );
        assert_eq!(purged.affected, 2);
        assert_eq!(purged.not_found, skus(&["Z9"]));
        assert_eq!(purged.entries[0].action, ChangeAction::PermanentDelete);

        let cleared = apply_ledger_op(
            LedgerOp::ClearAll,
            purged.active,
            purged.ledger,
            &mut log,
            &Reconciler::default(),
            at(),
        );
        assert_eq!(cleared.affected, 1);
        assert!(cleared.ledger.is_empty());
        assert_eq!(cleared.entries[0].action, ChangeAction::ClearDeleted);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_ledger_op_json_shape() {
        let op: LedgerOp = serde_json::from_str(r#"{"op":"restore","skus":["A1"]}"#).unwrap();
        assert_eq!(op, LedgerOp::Restore(skus(&["A1"])));
        let clear: LedgerOp = serde_json::from_str(r#"{"op":"clear_all"}"#).unwrap();
        assert_eq!(clear, LedgerOp::ClearAll);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating positive quantities
    fn quantity_strategy() -> impl Strategy<Value = i64> {
        1i64..=10_000i64
    }

    /// Strategy for a table of distinct skus
    fn table_strategy() -> impl Strategy<Value = InventoryTable> {
        prop::collection::btree_map("[A-H][0-9]{2}", quantity_strategy(), 1..12).prop_map(
            |rows: BTreeMap<String, i64>| {
                InventoryTable::new(
                    vec!["R1".to_string()],
                    rows.iter().map(|(sku, qty)| record(sku, *qty)).collect(),
                )
            },
        )
    }

    fn sorted(mut records: Vec<InventoryRecord>) -> Vec<InventoryRecord> {
        records.sort_by(|a, b| a.sku.cmp(&b.sku));
        records
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Deleting any subset and restoring it gives the same rows back
        #[test]
        fn prop_delete_restore_round_trip(
            table in table_strategy(),
            picks in prop::collection::vec(any::<bool>(), 12)
        ) {
            let selected: BTreeSet<String> = table
                .records
                .iter()
                .zip(picks.iter())
                .filter(|(_, pick)| **pick)
                .map(|(r, _)| r.sku.clone())
                .collect();
            prop_assume!(!selected.is_empty());

            let mut log = ChangeLog::new();
            let deleted = apply_ledger_op(
                LedgerOp::Delete(selected.clone()),
                table.clone(),
                SoftDeleteLedger::new(),
                &mut log,
                &Reconciler::default(),
                at(),
            );
            prop_assert_eq!(deleted.active.len() + deleted.ledger.len(), table.len());

            let restored = apply_ledger_op(
                LedgerOp::Restore(selected),
                deleted.active,
                deleted.ledger,
                &mut log,
                &Reconciler::default(),
                at(),
            );
            prop_assert!(restored.ledger.is_empty());
            prop_assert!(restored.conflicts.is_empty());
            prop_assert_eq!(sorted(restored.active.records), sorted(table.records));
            prop_assert_eq!(log.len(), 2);
        }

        /// Conflict restore adds every numeric field
        #[test]
        fn prop_conflict_restore_sums(active_qty in quantity_strategy(), deleted_qty in quantity_strategy()) {
            let mut log = ChangeLog::new();
            let result = apply_ledger_op(
                LedgerOp::Restore(skus(&["A100"])),
                InventoryTable::new(vec!["R1".to_string()], vec![record("A100", active_qty)]),
                SoftDeleteLedger::from_entries(vec![DeletedSkuRecord {
                    record: record("A100", deleted_qty),
                    deleted_at: at(),
                }]),
                &mut log,
                &Reconciler::default(),
                at(),
            );
            let merged = result.active.find("A100").unwrap();
            prop_assert_eq!(merged.quantity_available, dec(active_qty + deleted_qty));
            prop_assert_eq!(merged.total_quantity, dec(active_qty + deleted_qty));
            prop_assert_eq!(merged.quantity_at("R1"), dec(active_qty + deleted_qty));
            prop_assert_eq!(merged.status, RecordStatus::Active);
            prop_assert!(result.ledger.is_empty());
        }

        /// Every effective ledger operation appends exactly one log entry
        #[test]
        fn prop_one_entry_per_mutation(table in table_strategy()) {
            let all: BTreeSet<String> = table.records.iter().map(|r| r.sku.clone()).collect();
            let mut log = ChangeLog::new();
            let reconciler = Reconciler::default();

            let deleted = apply_ledger_op(LedgerOp::Delete(all.clone()), table, SoftDeleteLedger::new(), &mut log, &reconciler, at());
            prop_assert_eq!(deleted.entries.len(), 1);
            let purged = apply_ledger_op(LedgerOp::Purge(all), deleted.active, deleted.ledger, &mut log, &reconciler, at());
            prop_assert_eq!(purged.entries.len(), 1);
            prop_assert!(purged.ledger.is_empty());
            let cleared = apply_ledger_op(LedgerOp::ClearAll, purged.active, purged.ledger, &mut log, &reconciler, at());
            prop_assert!(cleared.entries.is_empty());
            prop_assert_eq!(log.len(), 2);
        }
    }
}
