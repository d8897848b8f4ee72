//! Column discovery for uploaded tables
//!
//! Fixed fields are matched by header alias. Location columns are whatever
//! else the sheet carries: taken from a caller hint, inferred from their
//! position between two anchor columns, or found by exclusion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RawTable;

/// Fields with a fixed meaning in every inventory sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedField {
    Sku,
    Description,
    QuantityOnHold,
    StandardCube,
    QuantityAvailable,
    TotalQuantity,
    Status,
    DeletedFlag,
}

impl FixedField {
    pub const ALL: [FixedField; 8] = [
        FixedField::Sku,
        FixedField::Description,
        FixedField::QuantityOnHold,
        FixedField::StandardCube,
        FixedField::QuantityAvailable,
        FixedField::TotalQuantity,
        FixedField::Status,
        FixedField::DeletedFlag,
    ];

    /// Header written on export
    pub fn canonical_header(&self) -> &'static str {
        match self {
            FixedField::Sku => "SKU",
            FixedField::Description => "Description",
            FixedField::QuantityOnHold => "QTYONHOLD",
            FixedField::StandardCube => "STDCUBE",
            FixedField::QuantityAvailable => "QTYAVAILABLE",
            FixedField::TotalQuantity => "TOTAL",
            FixedField::Status => "STATUS",
            FixedField::DeletedFlag => "DELETED",
        }
    }

    /// Accepted headers, compared case-insensitively
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            FixedField::Sku => &["SKU", "ITEM", "ITEM NUMBER"],
            FixedField::Description => &["DESCRIPTION", "DESC"],
            FixedField::QuantityOnHold => &["QTYONHOLD", "ON HOLD", "ONHOLD"],
            FixedField::StandardCube => &["STDCUBE", "STANDARD CUBE", "CUBE"],
            FixedField::QuantityAvailable => &["QTYAVAILABLE", "QTY AVAILABLE", "AVAILABLE"],
            FixedField::TotalQuantity => &["TOTAL", "TOTAL QTY", "TOTALQTY"],
            FixedField::Status => &["STATUS"],
            FixedField::DeletedFlag => &["DELETED", "IS_DELETED"],
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        self.aliases().iter().any(|a| a.eq_ignore_ascii_case(header))
    }

    /// Fixed field a header refers to, if any
    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.matches(header))
    }
}

/// Why an upload cannot be turned into an inventory table
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SchemaError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Anchor configuration for positional location inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub start_anchor: FixedField,
    pub end_anchor: FixedField,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            start_anchor: FixedField::QuantityAvailable,
            end_anchor: FixedField::TotalQuantity,
        }
    }
}

/// How location columns were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Hint,
    Anchors,
    Exclusion,
}

/// Resolved column positions for one raw table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    fixed: BTreeMap<FixedField, usize>,
    /// (location code, column index) in sheet order
    pub locations: Vec<(String, usize)>,
    pub source: LocationSource,
    /// Both anchors existed but nothing lay between them
    pub anchor_fallback: bool,
}

impl ColumnLayout {
    pub fn index_of(&self, field: FixedField) -> Option<usize> {
        self.fixed.get(&field).copied()
    }

    pub fn has(&self, field: FixedField) -> bool {
        self.fixed.contains_key(&field)
    }

    pub fn location_codes(&self) -> Vec<String> {
        self.locations.iter().map(|(code, _)| code.clone()).collect()
    }
}

impl ColumnSchema {
    /// Map headers to fields and discover location columns.
    ///
    /// Fails when `SKU` is absent or when neither `Description` nor
    /// `QTYAVAILABLE` is present.
    pub fn resolve(
        &self,
        raw: &RawTable,
        location_hint: Option<&[String]>,
    ) -> Result<ColumnLayout, SchemaError> {
        let mut fixed = BTreeMap::new();
        for (index, header) in raw.columns.iter().enumerate() {
            if let Some(field) = FixedField::from_header(header) {
                fixed.entry(field).or_insert(index);
            }
        }

        let mut missing = Vec::new();
        if !fixed.contains_key(&FixedField::Sku) {
            missing.push(FixedField::Sku.canonical_header().to_string());
        }
        let required = [FixedField::Description, FixedField::QuantityAvailable];
        if !required.iter().any(|f| fixed.contains_key(f)) {
            missing.extend(required.iter().map(|f| f.canonical_header().to_string()));
        }
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        let is_location = |index: usize, header: &str| {
            !header.trim().is_empty() && !fixed.values().any(|&i| i == index)
        };

        if let Some(hint) = location_hint {
            let locations: Vec<(String, usize)> = raw
                .columns
                .iter()
                .enumerate()
                .filter(|(i, h)| is_location(*i, h) && hint.iter().any(|c| c.trim() == h.trim()))
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect();
            if !locations.is_empty() {
                return Ok(ColumnLayout {
                    fixed,
                    locations: dedup_codes(locations),
                    source: LocationSource::Hint,
                    anchor_fallback: false,
                });
            }
        }

        let mut anchor_fallback = false;
        if let (Some(&start), Some(&end)) = (
            fixed.get(&self.start_anchor),
            fixed.get(&self.end_anchor),
        ) {
            let between: Vec<(String, usize)> = raw
                .columns
                .iter()
                .enumerate()
                .filter(|(i, h)| *i > start && *i < end && is_location(*i, h))
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect();
            if !between.is_empty() {
                return Ok(ColumnLayout {
                    fixed,
                    locations: dedup_codes(between),
                    source: LocationSource::Anchors,
                    anchor_fallback: false,
                });
            }
            anchor_fallback = true;
        }

        let excluded: Vec<(String, usize)> = raw
            .columns
            .iter()
            .enumerate()
            .filter(|(i, h)| is_location(*i, h))
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Ok(ColumnLayout {
            fixed,
            locations: dedup_codes(excluded),
            source: LocationSource::Exclusion,
            anchor_fallback,
        })
    }
}

/// First column wins when a sheet repeats a location header
fn dedup_codes(locations: Vec<(String, usize)>) -> Vec<(String, usize)> {
    let mut seen: Vec<(String, usize)> = Vec::with_capacity(locations.len());
    for (code, index) in locations {
        if !seen.iter().any(|(c, _)| *c == code) {
            seen.push((code, index));
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(columns: &[&str], hint: Option<&[String]>) -> Result<ColumnLayout, SchemaError> {
        ColumnSchema::default().resolve(&RawTable::new(columns.iter().copied()), hint)
    }

    #[test]
    fn test_missing_sku_is_schema_error() {
        let err = layout(&["Description", "QTYAVAILABLE"], None).unwrap_err();
        assert_eq!(err, SchemaError::MissingColumns(vec!["SKU".to_string()]));
    }

    #[test]
    fn test_no_required_fixed_columns() {
        let err = layout(&["SKU", "R1"], None).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns(vec!["Description".into(), "QTYAVAILABLE".into()])
        );
        assert!(err.to_string().contains("Description, QTYAVAILABLE"));
    }

    #[test]
    fn test_anchor_inference() {
        let l = layout(
            &["SKU", "Description", "QTYAVAILABLE", "A-01", "B-02", "TOTAL", "Notes"],
            None,
        )
        .unwrap();
        assert_eq!(l.source, LocationSource::Anchors);
        assert_eq!(l.location_codes(), vec!["A-01", "B-02"]);
        assert!(!l.anchor_fallback);
    }

    #[test]
    fn test_empty_anchor_span_falls_back_to_exclusion() {
        let l = layout(&["SKU", "QTYAVAILABLE", "TOTAL", "A-01"], None).unwrap();
        assert_eq!(l.source, LocationSource::Exclusion);
        assert!(l.anchor_fallback);
        assert_eq!(l.location_codes(), vec!["A-01"]);
    }

    #[test]
    fn test_exclusion_without_anchors() {
        let l = layout(&["sku", "description", "qtyavailable", "R1", "", "R2"], None).unwrap();
        assert_eq!(l.source, LocationSource::Exclusion);
        assert!(!l.anchor_fallback);
        assert_eq!(l.location_codes(), vec!["R1", "R2"]);
    }

    #[test]
    fn test_hint_filtered_to_present_columns() {
        let hint = vec!["R2".to_string(), "R9".to_string()];
        let l = layout(&["SKU", "QTYAVAILABLE", "R1", "R2", "TOTAL"], Some(&hint)).unwrap();
        assert_eq!(l.source, LocationSource::Hint);
        assert_eq!(l.location_codes(), vec!["R2"]);
    }

    #[test]
    fn test_aliases() {
        assert_eq!(FixedField::from_header(" qty available "), Some(FixedField::QuantityAvailable));
        assert_eq!(FixedField::from_header("Item Number"), Some(FixedField::Sku));
        assert_eq!(FixedField::from_header("R1"), None);
    }
}
