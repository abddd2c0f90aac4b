//! Row-level classifiers shared by every query that exposes them.
//!
//! RULE: income segment and holding status are computed here and only here.
//! The catalog appends them to query results; SQL never re-derives them.

use crate::table::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncomeSegment {
    Lower,
    MediumHigh,
    High,
    VeryHigh,
}

impl IncomeSegment {
    /// Threshold `income_level`. A missing level is treated as the lowest tier.
    pub fn from_level(level: Option<i64>) -> Self {
        match level {
            Some(l) if l >= 6 => IncomeSegment::VeryHigh,
            Some(l) if l >= 4 => IncomeSegment::High,
            Some(l) if l >= 3 => IncomeSegment::MediumHigh,
            _ => IncomeSegment::Lower,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IncomeSegment::VeryHigh => "Very High Income (>25 Juta)",
            IncomeSegment::High => "High Income (>5 Juta)",
            IncomeSegment::MediumHigh => "Medium-High Income (>3 Juta)",
            IncomeSegment::Lower => "Lower Income",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingStatus {
    Active,
    Inactive,
}

impl HoldingStatus {
    pub fn from_amount(amount: Option<f64>) -> Self {
        match amount {
            Some(a) if a > 0.0 => HoldingStatus::Active,
            _ => HoldingStatus::Inactive,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HoldingStatus::Active => "Active",
            HoldingStatus::Inactive => "Inactive",
        }
    }
}

/// `income_level` cell → `income_segment` cell.
/// Levels compare numerically, as the SQL `CASE` did, including levels
/// stored as text. Non-numeric text counts as missing.
pub fn income_segment_cell(level: &Value) -> Value {
    let numeric = match level {
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    let segment = IncomeSegment::from_level(numeric.map(|f| f.floor() as i64));
    Value::from(segment.label())
}

/// `cleaned_amount` cell → `status` cell.
pub fn holding_status_cell(amount: &Value) -> Value {
    Value::from(HoldingStatus::from_amount(amount.as_f64()).label())
}
