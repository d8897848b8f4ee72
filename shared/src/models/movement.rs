//! Stock movement history

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether available stock went up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    In,
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }
}

/// A change in available quantity caused by a manual add or edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub sku: String,
    pub direction: MovementDirection,
    /// Absolute size of the change
    pub quantity_change: Decimal,
    /// Available quantity after the change
    pub current_quantity: Decimal,
    pub at: DateTime<Utc>,
}

impl StockMovement {
    /// Movement between two available quantities, `None` when unchanged
    pub fn between(
        sku: &str,
        previous: Decimal,
        current: Decimal,
        at: DateTime<Utc>,
    ) -> Option<Self> {
        if previous == current {
            return None;
        }
        let direction = if current > previous {
            MovementDirection::In
        } else {
            MovementDirection::Out
        };
        Some(Self {
            sku: sku.to_string(),
            direction,
            quantity_change: (current - previous).abs(),
            current_quantity: current,
            at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_direction() {
        let at = Utc::now();
        let up = StockMovement::between("A1", Decimal::from(5), Decimal::from(8), at).unwrap();
        assert_eq!(up.direction, MovementDirection::In);
        assert_eq!(up.quantity_change, Decimal::from(3));

        let down = StockMovement::between("A1", Decimal::from(8), Decimal::from(2), at).unwrap();
        assert_eq!(down.direction, MovementDirection::Out);
        assert_eq!(down.quantity_change, Decimal::from(6));
        assert_eq!(down.current_quantity, Decimal::from(2));

        assert!(StockMovement::between("A1", Decimal::ONE, Decimal::ONE, at).is_none());
    }
}
