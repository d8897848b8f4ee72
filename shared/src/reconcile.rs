//! Inventory reconciliation
//!
//! Turns an uploaded or edited table into a clean [`InventoryTable`]:
//! numeric fields are coerced, blank skus dropped, totals back-filled,
//! status synchronised with the deleted flag, and duplicates plus
//! location-sum violations reported. Only a schema problem fails the call;
//! every other anomaly comes back as a [`ReconcileWarning`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coercion::{clip_non_negative, coerce_flag, coerce_quantity, coerce_text, normalize_flag};
use crate::models::{InventoryRecord, InventoryTable, RecordStatus};
use crate::schema::{ColumnLayout, ColumnSchema, FixedField, SchemaError};
use crate::types::RawTable;

/// Whether a warning is a problem or just a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Info,
    Warning,
}

/// Non-fatal findings from a reconcile pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileWarning {
    /// Both anchor columns exist but nothing lies between them
    AnchorFallback,
    /// Cells that were not numbers and were read as zero
    MalformedValues { column: String, count: usize },
    BlankSkuRowsDropped { count: usize },
    /// Active rows with a zero total that were switched to deleted
    AutoDeactivated { count: usize },
    /// `count` is the number of repeat rows, `skus` the distinct repeated values
    DuplicateSkus { count: usize, skus: Vec<String> },
    LocationSumExceedsAvailable { count: usize },
}

impl ReconcileWarning {
    pub fn severity(&self) -> WarningSeverity {
        match self {
            ReconcileWarning::AutoDeactivated { .. } => WarningSeverity::Info,
            _ => WarningSeverity::Warning,
        }
    }
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileWarning::AnchorFallback => write!(
                f,
                "No location columns found between anchor columns; using all non-fixed columns"
            ),
            ReconcileWarning::MalformedValues { column, count } => {
                write!(f, "{} non-numeric value(s) in '{}' were read as 0", count, column)
            }
            ReconcileWarning::BlankSkuRowsDropped { count } => {
                write!(f, "Dropped {} row(s) with a blank SKU", count)
            }
            ReconcileWarning::AutoDeactivated { count } => {
                write!(f, "{} SKU(s) with zero total quantity marked as deleted", count)
            }
            ReconcileWarning::DuplicateSkus { count, skus } => {
                write!(f, "{} duplicate SKU row(s) found: {}", count, skus.join(", "))
            }
            ReconcileWarning::LocationSumExceedsAvailable { count } => write!(
                f,
                "{} SKU(s) have location quantities exceeding quantity available",
                count
            ),
        }
    }
}

/// A row whose location quantities add up to more than is available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationViolation {
    pub sku: String,
    pub location_sum: Decimal,
    pub quantity_available: Decimal,
}

/// Output of a successful reconcile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub table: InventoryTable,
    pub warnings: Vec<ReconcileWarning>,
    pub violations: Vec<LocationViolation>,
}

impl ReconcileResult {
    /// Repeat rows reported by duplicate detection
    pub fn duplicate_count(&self) -> usize {
        self.warnings
            .iter()
            .find_map(|w| match w {
                ReconcileWarning::DuplicateSkus { count, .. } => Some(*count),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn auto_deactivated(&self) -> usize {
        self.warnings
            .iter()
            .find_map(|w| match w {
                ReconcileWarning::AutoDeactivated { count } => Some(*count),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Row between coercion and the derived-field steps
struct StagedRow {
    sku: String,
    description: String,
    quantity_on_hold: Decimal,
    standard_cube: Decimal,
    quantity_available: Decimal,
    locations: BTreeMap<String, Decimal>,
    /// `None` when the total cell was blank or the column absent
    total: Option<Decimal>,
    deleted_flag: u8,
}

/// Stateless reconcile pass parameterised by the column schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciler {
    schema: ColumnSchema,
}

impl Reconciler {
    pub fn new(schema: ColumnSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Reconcile an untyped upload. Fails only on a [`SchemaError`].
    pub fn reconcile(
        &self,
        raw: &RawTable,
        location_hint: Option<&[String]>,
    ) -> Result<ReconcileResult, SchemaError> {
        let layout = self.schema.resolve(raw, location_hint)?;

        let mut warnings = Vec::new();
        if layout.anchor_fallback {
            warnings.push(ReconcileWarning::AnchorFallback);
        }

        let mut malformed: BTreeMap<usize, usize> = BTreeMap::new();
        let staged: Vec<StagedRow> = (0..raw.row_count())
            .map(|row| stage_raw_row(raw, &layout, row, &mut malformed))
            .collect();

        for (column, count) in malformed {
            warnings.push(ReconcileWarning::MalformedValues {
                column: raw.columns[column].trim().to_string(),
                count,
            });
        }

        Ok(finish(layout.location_codes(), staged, warnings))
    }

    /// Re-run the derived steps over an already typed table
    pub fn reconcile_table(&self, table: &InventoryTable) -> ReconcileResult {
        self.reconcile_table_with(table, &BTreeSet::new())
    }

    /// Like [`Self::reconcile_table`], treating the totals of the rows at
    /// `backfill` as blank so they are recomputed from location sums.
    pub fn reconcile_table_with(
        &self,
        table: &InventoryTable,
        backfill: &BTreeSet<usize>,
    ) -> ReconcileResult {
        let mut location_columns = table.location_columns.clone();
        for record in &table.records {
            for code in record.location_quantities.keys() {
                if !location_columns.iter().any(|c| c == code) {
                    location_columns.push(code.clone());
                }
            }
        }

        let staged = table
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| StagedRow {
                sku: record.sku.clone(),
                description: record.description.clone(),
                quantity_on_hold: clip_non_negative(record.quantity_on_hold),
                standard_cube: clip_non_negative(record.standard_cube),
                quantity_available: clip_non_negative(record.quantity_available),
                locations: location_columns
                    .iter()
                    .map(|code| (code.clone(), clip_non_negative(record.quantity_at(code))))
                    .collect(),
                total: (!backfill.contains(&index)).then_some(record.total_quantity),
                deleted_flag: if record.status == RecordStatus::Deleted {
                    1
                } else {
                    normalize_flag(Decimal::from(record.deleted_flag))
                },
            })
            .collect();

        finish(location_columns, staged, Vec::new())
    }
}

/// Reconcile with the default anchors
pub fn reconcile(
    raw: &RawTable,
    location_hint: Option<&[String]>,
) -> Result<ReconcileResult, SchemaError> {
    Reconciler::default().reconcile(raw, location_hint)
}

fn coerce_column(
    raw: &RawTable,
    row: usize,
    column: Option<usize>,
    malformed: &mut BTreeMap<usize, usize>,
) -> Decimal {
    let Some(column) = column else {
        return Decimal::ZERO;
    };
    let coerced = coerce_quantity(raw.cell(row, column));
    if coerced.malformed {
        *malformed.entry(column).or_insert(0) += 1;
    }
    coerced.value
}

fn stage_raw_row(
    raw: &RawTable,
    layout: &ColumnLayout,
    row: usize,
    malformed: &mut BTreeMap<usize, usize>,
) -> StagedRow {
    let text = |field: FixedField| {
        layout
            .index_of(field)
            .map(|i| coerce_text(raw.cell(row, i)))
            .unwrap_or_default()
    };

    let total = match layout.index_of(FixedField::TotalQuantity) {
        Some(i) if !raw.cell(row, i).is_blank() => {
            Some(coerce_column(raw, row, Some(i), malformed))
        }
        _ => None,
    };

    let deleted_flag = match (
        layout.index_of(FixedField::DeletedFlag),
        layout.index_of(FixedField::Status),
    ) {
        (Some(i), _) => coerce_flag(raw.cell(row, i)),
        (None, Some(i)) => {
            let status = RecordStatus::parse(&coerce_text(raw.cell(row, i)));
            u8::from(status == Some(RecordStatus::Deleted))
        }
        (None, None) => 0,
    };

    StagedRow {
        sku: text(FixedField::Sku),
        description: text(FixedField::Description),
        quantity_on_hold: coerce_column(
            raw,
            row,
            layout.index_of(FixedField::QuantityOnHold),
            malformed,
        ),
        standard_cube: coerce_column(raw, row, layout.index_of(FixedField::StandardCube), malformed),
        quantity_available: coerce_column(
            raw,
            row,
            layout.index_of(FixedField::QuantityAvailable),
            malformed,
        ),
        locations: layout
            .locations
            .iter()
            .map(|(code, i)| (code.clone(), coerce_column(raw, row, Some(*i), malformed)))
            .collect(),
        total,
        deleted_flag,
    }
}

/// Steps after coercion, shared by raw and typed input
fn finish(
    location_columns: Vec<String>,
    staged: Vec<StagedRow>,
    mut warnings: Vec<ReconcileWarning>,
) -> ReconcileResult {
    let before = staged.len();
    let staged: Vec<StagedRow> = staged
        .into_iter()
        .filter(|row| !row.sku.trim().is_empty())
        .collect();
    let dropped = before - staged.len();
    if dropped > 0 {
        warnings.push(ReconcileWarning::BlankSkuRowsDropped { count: dropped });
    }

    let mut records: Vec<InventoryRecord> = staged
        .into_iter()
        .map(|row| {
            let location_sum: Decimal = row.locations.values().sum();
            let total_quantity = clip_non_negative(row.total.unwrap_or(location_sum));
            let status = if row.deleted_flag == 1 {
                RecordStatus::Deleted
            } else {
                RecordStatus::Active
            };
            InventoryRecord {
                sku: row.sku.trim().to_string(),
                description: row.description,
                quantity_on_hold: row.quantity_on_hold,
                standard_cube: row.standard_cube,
                quantity_available: row.quantity_available,
                location_quantities: row.locations,
                total_quantity,
                status,
                deleted_flag: row.deleted_flag,
            }
        })
        .collect();

    // One-way: a positive total never reactivates a deleted row.
    let mut deactivated = 0;
    for record in records
        .iter_mut()
        .filter(|r| r.is_active() && r.total_quantity.is_zero())
    {
        record.mark_deleted();
        deactivated += 1;
    }
    if deactivated > 0 {
        warnings.push(ReconcileWarning::AutoDeactivated { count: deactivated });
    }

    let mut seen = HashSet::new();
    let mut repeated = BTreeSet::new();
    let mut repeat_rows = 0;
    for record in &records {
        if !seen.insert(record.sku.as_str()) {
            repeat_rows += 1;
            repeated.insert(record.sku.clone());
        }
    }
    if repeat_rows > 0 {
        warnings.push(ReconcileWarning::DuplicateSkus {
            count: repeat_rows,
            skus: repeated.into_iter().collect(),
        });
    }

    let violations: Vec<LocationViolation> = records
        .iter()
        .filter_map(|r| {
            let location_sum = r.location_sum();
            (location_sum > r.quantity_available).then(|| LocationViolation {
                sku: r.sku.clone(),
                location_sum,
                quantity_available: r.quantity_available,
            })
        })
        .collect();
    if !violations.is_empty() {
        warnings.push(ReconcileWarning::LocationSumExceedsAvailable {
            count: violations.len(),
        });
    }

    ReconcileResult {
        table: InventoryTable::new(location_columns, records),
        warnings,
        violations,
    }
}
