//! Typed views over catalog tables, decoded with `Table::decode`.
//!
//! Staging columns are lightly cleaned upstream, so most fields are optional.

use crate::types::CustomerId;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    #[serde(deserialize_with = "id_from_text_or_number")]
    pub customer_id: CustomerId,
    pub gender: Option<String>,
    pub income_bracket: Option<String>,
    #[serde(default, deserialize_with = "level_from_number_or_text")]
    pub income_level: Option<f64>,
    pub income_segment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHolding {
    pub product_name: Option<String>,
    pub product_category: Option<String>,
    pub cleaned_amount: Option<f64>,
    pub status: String,
}

impl PortfolioHolding {
    pub fn is_active(&self) -> bool {
        self.status == "Active"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub product_category: Option<String>,
    pub product_count: Option<i64>,
    pub total_amount: Option<f64>,
    pub avg_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub min_amount: Option<f64>,
    pub portfolio_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_date: Option<String>,
    pub transaction_method: Option<String>,
    pub transaction_type: Option<String>,
    pub cleaned_transaction_amount: Option<f64>,
    pub transaction_year: Option<i64>,
    pub transaction_month: Option<i64>,
    pub transaction_day_of_week: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_transactions: Option<i64>,
    pub total_spent: Option<f64>,
    pub avg_transaction_amount: Option<f64>,
    pub max_transaction_amount: Option<f64>,
    pub min_transaction_amount: Option<f64>,
    pub payment_methods_used: Option<i64>,
    pub transaction_types_used: Option<i64>,
    pub first_transaction_date: Option<String>,
    pub last_transaction_date: Option<String>,
    pub transactions_per_day: Option<f64>,
}

/// Customer ids may be stored as integers; the dashboard always handles text.
fn id_from_text_or_number<'de, D>(deserializer: D) -> Result<CustomerId, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "customer_id must be text or number, got {other}"
        ))),
    }
}

/// Income levels may be loaded as text; numeric text is accepted, anything else is an error.
fn level_from_number_or_text<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        serde_json::Value::String(s) => s.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("income_level must be numeric, got {s:?}"))
        }),
        other => Err(serde::de::Error::custom(format!(
            "income_level must be numeric, got {other}"
        ))),
    }
}
