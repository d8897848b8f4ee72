//! Request models for the Warehouse Inventory Dashboard
//!
//! Payloads used only by the HTTP layer; domain types live in the shared crate

use std::collections::BTreeSet;

use serde::Deserialize;

pub use shared::{InventoryFilter, RawTable};

/// JSON upload: the parsed sheet plus an optional location column list
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub table: RawTable,
    #[serde(default)]
    pub location_columns: Option<Vec<String>>,
}

/// Query for CSV uploads
#[derive(Debug, Default, Deserialize)]
pub struct CsvUploadQuery {
    /// Comma separated location column list
    pub location_columns: Option<String>,
}

impl CsvUploadQuery {
    pub fn location_hint(&self) -> Option<Vec<String>> {
        self.location_columns.as_deref().map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// A set of skus to delete, restore or purge
#[derive(Debug, Deserialize)]
pub struct SkuSelection {
    pub skus: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdInput {
    pub threshold: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub sku: Option<String>,
}
