use serde::{Deserialize, Serialize};

use super::ChangeType;

/// An item whose price moved past the threshold between two captures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeRecord {
    pub source: String,
    pub name: String,
    pub previous_price: f64,
    pub current_price: f64,
    /// Signed percentage change, rounded to two decimals.
    pub delta_percent: f64,
}

impl ChangeRecord {
    pub fn change_type(&self) -> ChangeType {
        if self.current_price > self.previous_price {
            ChangeType::Increased
        } else if self.current_price < self.previous_price {
            ChangeType::Decreased
        } else {
            ChangeType::Unchanged
        }
    }
}
