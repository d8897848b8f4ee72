//! Inventory record and table models

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::schema::FixedField;
use crate::types::{CellValue, RawTable};

/// Lifecycle status of an inventory row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RecordStatus {
    #[default]
    Active,
    Deleted,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "Active",
            RecordStatus::Deleted => "Deleted",
        }
    }

    /// Parse a spreadsheet status cell; anything unrecognised is `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(RecordStatus::Active),
            "deleted" | "inactive" => Some(RecordStatus::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One SKU row of the active inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity_on_hold: Decimal,
    #[serde(default)]
    pub standard_cube: Decimal,
    #[serde(default)]
    pub quantity_available: Decimal,
    /// Quantity per location code
    #[serde(default)]
    pub location_quantities: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub total_quantity: Decimal,
    #[serde(default)]
    pub status: RecordStatus,
    /// Mirror of `status` kept for spreadsheet round-tripping, always 0 or 1
    #[serde(default)]
    pub deleted_flag: u8,
}

impl InventoryRecord {
    pub fn new(sku: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            description: description.into(),
            quantity_on_hold: Decimal::ZERO,
            standard_cube: Decimal::ZERO,
            quantity_available: Decimal::ZERO,
            location_quantities: BTreeMap::new(),
            total_quantity: Decimal::ZERO,
            status: RecordStatus::Active,
            deleted_flag: 0,
        }
    }

    /// Set a location quantity, builder style
    pub fn with_location(mut self, code: impl Into<String>, quantity: Decimal) -> Self {
        self.location_quantities.insert(code.into(), quantity);
        self
    }

    pub fn quantity_at(&self, location: &str) -> Decimal {
        self.location_quantities
            .get(location)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn location_sum(&self) -> Decimal {
        self.location_quantities.values().sum()
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// Move to `Deleted`, keeping the flag in lockstep
    pub fn mark_deleted(&mut self) {
        self.status = RecordStatus::Deleted;
        self.deleted_flag = 1;
    }

    pub fn mark_active(&mut self) {
        self.status = RecordStatus::Active;
        self.deleted_flag = 0;
    }
}

/// The active inventory: rows plus the location key set discovered for them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryTable {
    pub location_columns: Vec<String>,
    pub records: Vec<InventoryRecord>,
}

impl InventoryTable {
    pub fn new(location_columns: Vec<String>, records: Vec<InventoryRecord>) -> Self {
        Self {
            location_columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First row carrying this sku
    pub fn find(&self, sku: &str) -> Option<&InventoryRecord> {
        self.records.iter().find(|r| r.sku == sku)
    }

    pub fn position(&self, sku: &str) -> Option<usize> {
        self.records.iter().position(|r| r.sku == sku)
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.position(sku).is_some()
    }

    /// Register a location code if it is not known yet
    pub fn ensure_location(&mut self, code: &str) {
        if !self.location_columns.iter().any(|c| c == code) {
            self.location_columns.push(code.to_string());
        }
    }

    /// Headers in reconcile order: fixed fields, locations between the
    /// available/total anchors, then status and deleted flag.
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = [
            FixedField::Sku,
            FixedField::Description,
            FixedField::QuantityOnHold,
            FixedField::StandardCube,
            FixedField::QuantityAvailable,
        ]
        .iter()
        .map(|f| f.canonical_header().to_string())
        .collect();
        headers.extend(self.location_columns.iter().cloned());
        headers.extend(
            [
                FixedField::TotalQuantity,
                FixedField::Status,
                FixedField::DeletedFlag,
            ]
            .iter()
            .map(|f| f.canonical_header().to_string()),
        );
        headers
    }

    /// Flatten back to spreadsheet form
    pub fn to_raw_table(&self) -> RawTable {
        let mut raw = RawTable::new(self.headers());
        for record in &self.records {
            let mut cells = vec![
                CellValue::Text(record.sku.clone()),
                CellValue::Text(record.description.clone()),
                CellValue::Number(record.quantity_on_hold),
                CellValue::Number(record.standard_cube),
                CellValue::Number(record.quantity_available),
            ];
            cells.extend(
                self.location_columns
                    .iter()
                    .map(|code| CellValue::Number(record.quantity_at(code))),
            );
            cells.push(CellValue::Number(record.total_quantity));
            cells.push(CellValue::Text(record.status.as_str().to_string()));
            cells.push(CellValue::Number(Decimal::from(record.deleted_flag)));
            raw.rows.push(cells);
        }
        raw
    }
}
