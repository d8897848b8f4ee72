//! Validation utilities for manual inventory input
//!
//! Uploads are never rejected row by row (see [`crate::reconcile`]); these
//! checks guard the add/edit forms and settings.

use rust_decimal::Decimal;

use crate::schema::FixedField;

/// Longest accepted SKU
pub const MAX_SKU_LENGTH: usize = 64;

/// Bounds of the low stock threshold setting
pub const MIN_LOW_STOCK_THRESHOLD: u32 = 1;
pub const MAX_LOW_STOCK_THRESHOLD: u32 = 100;

// ============================================================================
// Record Validations
// ============================================================================

/// Validate a SKU entered by hand
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err("SKU is required");
    }
    if trimmed.chars().count() > MAX_SKU_LENGTH {
        return Err("SKU must be at most 64 characters");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("SKU cannot contain control characters");
    }
    Ok(())
}

/// Validate a quantity entered by hand
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Validate a new location code. Codes that collide with a fixed column
/// header would be read back as that field.
pub fn validate_location_code(code: &str) -> Result<(), &'static str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err("Location code is required");
    }
    if FixedField::from_header(trimmed).is_some() {
        return Err("Location code clashes with a reserved column name");
    }
    Ok(())
}

// ============================================================================
// Settings Validations
// ============================================================================

/// Validate the low stock threshold (1-100)
pub fn validate_low_stock_threshold(threshold: u32) -> Result<(), &'static str> {
    if !(MIN_LOW_STOCK_THRESHOLD..=MAX_LOW_STOCK_THRESHOLD).contains(&threshold) {
        return Err("Low stock threshold must be between 1 and 100");
    }
    Ok(())
}
