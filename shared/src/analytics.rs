//! Dashboard analytics: KPI cards, stock levels and table filtering

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{InventoryRecord, InventoryTable, RecordStatus};

/// Default low stock threshold
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

/// Stock level band for a row, based on quantity available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    /// At or below the threshold
    Low,
    /// At or below twice the threshold
    Medium,
    Healthy,
}

impl StockLevel {
    pub fn classify(available: Decimal, threshold: u32) -> Self {
        let threshold = Decimal::from(threshold);
        if available <= threshold {
            StockLevel::Low
        } else if available <= threshold * Decimal::TWO {
            StockLevel::Medium
        } else {
            StockLevel::Healthy
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockLevel::Low => write!(f, "Low"),
            StockLevel::Medium => write!(f, "Medium"),
            StockLevel::Healthy => write!(f, "Healthy"),
        }
    }
}

/// Headline numbers for the overview tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryKpis {
    pub active_skus: usize,
    pub deleted_status_skus: usize,
    pub total_available: Decimal,
    pub total_quantity: Decimal,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub location_totals: BTreeMap<String, Decimal>,
    pub deleted_items: usize,
}

/// Compute KPIs over the active rows. `deleted_items` is the ledger size.
pub fn compute_kpis(table: &InventoryTable, threshold: u32, deleted_items: usize) -> InventoryKpis {
    let active: Vec<&InventoryRecord> = table.records.iter().filter(|r| r.is_active()).collect();

    let mut location_totals: BTreeMap<String, Decimal> = table
        .location_columns
        .iter()
        .map(|code| (code.clone(), Decimal::ZERO))
        .collect();
    for record in &active {
        for (code, quantity) in &record.location_quantities {
            *location_totals.entry(code.clone()).or_default() += *quantity;
        }
    }

    InventoryKpis {
        active_skus: active.len(),
        deleted_status_skus: table.len() - active.len(),
        total_available: active.iter().map(|r| r.quantity_available).sum(),
        total_quantity: active.iter().map(|r| r.total_quantity).sum(),
        low_stock: active
            .iter()
            .filter(|r| StockLevel::classify(r.quantity_available, threshold) == StockLevel::Low)
            .count(),
        out_of_stock: active
            .iter()
            .filter(|r| r.quantity_available.is_zero())
            .count(),
        location_totals,
        deleted_items,
    }
}

/// Active rows at the low band, lowest stock first
pub fn low_stock_alerts(table: &InventoryTable, threshold: u32) -> Vec<InventoryRecord> {
    let mut alerts: Vec<InventoryRecord> = table
        .records
        .iter()
        .filter(|r| {
            r.is_active() && StockLevel::classify(r.quantity_available, threshold) == StockLevel::Low
        })
        .cloned()
        .collect();
    alerts.sort_by(|a, b| a.quantity_available.cmp(&b.quantity_available));
    alerts
}

/// Search and filter settings for the inventory table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    /// Case-insensitive substring over sku and description
    pub search: Option<String>,
    /// Keep rows with stock at this location
    pub location: Option<String>,
    pub status: Option<RecordStatus>,
}

impl InventoryFilter {
    pub fn matches(&self, record: &InventoryRecord) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !record.sku.to_lowercase().contains(&term)
                && !record.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if record.quantity_at(location).is_zero() {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, table: &InventoryTable) -> Vec<InventoryRecord> {
        table
            .records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}
