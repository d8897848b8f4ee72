//! Numeric coercion for spreadsheet cells
//!
//! Every quantity field goes through [`coerce_quantity`]. Unparseable input
//! silently becomes zero; the `malformed` marker lets callers that need
//! stricter checks report what was masked.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::types::CellValue;

/// Result of coercing one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coerced {
    pub value: Decimal,
    /// The cell held something that was not a number and was replaced by zero
    pub malformed: bool,
}

impl Coerced {
    fn ok(value: Decimal) -> Self {
        Self {
            value,
            malformed: false,
        }
    }

    fn masked() -> Self {
        Self {
            value: Decimal::ZERO,
            malformed: true,
        }
    }
}

/// Parse numeric text: trims, drops thousands separators, accepts
/// scientific notation.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Coerce a cell to a non-negative quantity. Blank cells are zero and not
/// considered malformed.
pub fn coerce_quantity(cell: &CellValue) -> Coerced {
    let coerced = match cell {
        CellValue::Empty => Coerced::ok(Decimal::ZERO),
        CellValue::Bool(b) => Coerced::ok(if *b { Decimal::ONE } else { Decimal::ZERO }),
        CellValue::Number(n) => Coerced::ok(*n),
        CellValue::Text(s) if s.trim().is_empty() => Coerced::ok(Decimal::ZERO),
        CellValue::Text(s) => match parse_decimal(s) {
            Some(n) => Coerced::ok(n),
            None => Coerced::masked(),
        },
    };
    Coerced {
        value: clip_non_negative(coerced.value),
        ..coerced
    }
}

/// Coerce a deleted-flag cell to 0 or 1
pub fn coerce_flag(cell: &CellValue) -> u8 {
    if let CellValue::Text(s) = cell {
        if matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y"
        ) {
            return 1;
        }
    }
    normalize_flag(coerce_quantity(cell).value)
}

/// Clip a numeric flag into {0, 1}
pub fn normalize_flag(value: Decimal) -> u8 {
    if value >= Decimal::ONE {
        1
    } else {
        0
    }
}

pub fn clip_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Text form of a cell for string fields (sku, description)
pub fn coerce_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.clone(),
        other => other.display(),
    }
}
