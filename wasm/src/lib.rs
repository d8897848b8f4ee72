//! WebAssembly module for the Warehouse Inventory Dashboard
//!
//! Provides client-side computation for:
//! - Reconcile preview of a parsed sheet before it is uploaded
//! - Stock level classification
//! - SKU validation for the add form

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::{reconcile, validate_sku, RawTable, StockLevel};

/// Reconcile a sheet given as JSON (`{ columns, rows }`) and return the
/// reconcile result as JSON. `location_hint_json` is a JSON array of
/// location column names, or empty to infer them.
#[wasm_bindgen]
pub fn reconcile_preview(table_json: &str, location_hint_json: &str) -> Result<String, JsValue> {
    preview(table_json, location_hint_json).map_err(|e| JsValue::from_str(&e))
}

fn preview(table_json: &str, location_hint_json: &str) -> Result<String, String> {
    let raw: RawTable =
        serde_json::from_str(table_json).map_err(|e| format!("Invalid table JSON: {}", e))?;
    let hint: Option<Vec<String>> = if location_hint_json.trim().is_empty() {
        None
    } else {
        serde_json::from_str(location_hint_json)
            .map_err(|e| format!("Invalid location list JSON: {}", e))?
    };

    let result = reconcile(&raw, hint.as_deref()).map_err(|e| e.to_string())?;
    serde_json::to_string(&result).map_err(|e| format!("Could not encode result: {}", e))
}

/// Stock level band ("Low", "Medium", "Healthy") for an available quantity
#[wasm_bindgen]
pub fn classify_stock_level(available: f64, threshold: u32) -> String {
    let available = Decimal::try_from(available).unwrap_or(Decimal::ZERO);
    StockLevel::classify(available, threshold).to_string()
}

/// Whether a SKU would be accepted by the add form
#[wasm_bindgen]
pub fn is_valid_sku(sku: &str) -> bool {
    validate_sku(sku).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_returns_clean_table() {
        let table = r#"{
            "columns": ["SKU", "QTYAVAILABLE", "R1", "TOTAL"],
            "rows": [["A1", 4, 4, null], ["  ", 1, 1, 1]]
        }"#;
        let json = preview(table, "").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["table"]["records"].as_array().unwrap().len(), 1);
        assert_eq!(value["table"]["location_columns"][0], "R1");
        assert_eq!(value["warnings"][0]["kind"], "blank_sku_rows_dropped");
    }

    #[test]
    fn test_preview_reports_schema_error() {
        let table = r#"{ "columns": ["Description"], "rows": [["Bolt"]] }"#;
        let err = preview(table, "").unwrap_err();
        assert!(err.starts_with("Missing required columns"));
    }

    #[test]
    fn test_preview_rejects_bad_json() {
        assert!(preview("not json", "").is_err());
        assert!(preview(r#"{ "columns": ["SKU"], "rows": [] }"#, "{").is_err());
    }

    #[test]
    fn test_classify_stock_level() {
        assert_eq!(classify_stock_level(3.0, 10), "Low");
        assert_eq!(classify_stock_level(15.0, 10), "Medium");
        assert_eq!(classify_stock_level(50.0, 10), "Healthy");
    }

    #[test]
    fn test_is_valid_sku() {
        assert!(is_valid_sku("A-100"));
        assert!(!is_valid_sku("   "));
    }
}
