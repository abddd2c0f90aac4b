//! Metrics the dashboard derives from catalog outputs.
//!
//! These are threshold classifiers and small folds over already-fetched
//! tables. They never query the store.

use crate::{
    error::DashResult,
    model::{CategorySummary, PortfolioHolding, TransactionRecord, TransactionSummary},
    table::Table,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Portfolio total above which a customer counts as high value.
pub const HIGH_VALUE_PORTFOLIO: f64 = 1_000_000.0;
/// Transaction count above which activity counts as high.
pub const HIGH_ACTIVITY_TRANSACTIONS: i64 = 50;
/// Income level at or above which risk counts as low.
pub const LOW_RISK_INCOME_LEVEL: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::High => "High",
            Rating::Medium => "Medium",
            Rating::Low => "Low",
        }
    }
}

pub fn customer_value_score(total_portfolio: f64) -> Rating {
    if total_portfolio > HIGH_VALUE_PORTFOLIO {
        Rating::High
    } else {
        Rating::Medium
    }
}

pub fn activity_level(total_transactions: i64) -> Rating {
    if total_transactions > HIGH_ACTIVITY_TRANSACTIONS {
        Rating::High
    } else {
        Rating::Medium
    }
}

pub fn risk_profile(income_level: Option<f64>) -> Rating {
    match income_level {
        Some(level) if level >= LOW_RISK_INCOME_LEVEL => Rating::Low,
        _ => Rating::Medium,
    }
}

/// Sum of `total_amount` over the mart's per-category rows.
pub fn portfolio_total(summary: &Table) -> f64 {
    summary
        .column_values("total_amount")
        .filter_map(|v| v.as_f64())
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerInsights {
    pub value_score: Rating,
    pub activity_level: Rating,
    pub risk_profile: Rating,
}

impl CustomerInsights {
    /// `None` unless both summaries have rows.
    pub fn compute(
        portfolio_summary: &Table,
        transaction_summary: &Table,
        income_level: Option<f64>,
    ) -> DashResult<Option<Self>> {
        if portfolio_summary.is_empty() || transaction_summary.is_empty() {
            return Ok(None);
        }
        let total_transactions = transaction_summary
            .decode::<TransactionSummary>()?
            .first()
            .and_then(|s| s.total_transactions)
            .unwrap_or(0);
        Ok(Some(Self {
            value_score: customer_value_score(portfolio_total(portfolio_summary)),
            activity_level: activity_level(total_transactions),
            risk_profile: risk_profile(income_level),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioOverview {
    pub total_value: f64,
    pub active_products: usize,
    pub categories: usize,
}

impl PortfolioOverview {
    pub fn compute(portfolio: &Table, summary: &Table) -> DashResult<Self> {
        let holdings: Vec<PortfolioHolding> = portfolio.decode()?;
        let categories: BTreeSet<String> = summary
            .decode::<CategorySummary>()?
            .into_iter()
            .filter_map(|c| c.product_category)
            .collect();
        Ok(Self {
            total_value: portfolio_total(summary),
            active_products: holdings.iter().filter(|h| h.is_active()).count(),
            categories: categories.len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionOverview {
    pub total_transactions: i64,
    pub total_spent: f64,
    pub avg_transaction: f64,
    pub payment_methods: i64,
    pub transaction_types: i64,
    pub transactions_per_day: f64,
}

impl TransactionOverview {
    /// Read from the single mart row; `None` when the customer has none.
    pub fn from_summary(summary: &Table) -> DashResult<Option<Self>> {
        let Some(s) = summary.decode::<TransactionSummary>()?.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(Self {
            total_transactions: s.total_transactions.unwrap_or(0),
            total_spent: s.total_spent.unwrap_or(0.0),
            avg_transaction: s.avg_transaction_amount.unwrap_or(0.0),
            payment_methods: s.payment_methods_used.unwrap_or(0),
            transaction_types: s.transaction_types_used.unwrap_or(0),
            transactions_per_day: s.transactions_per_day.unwrap_or(0.0),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAmount {
    /// `YYYY-MM`
    pub month: String,
    pub amount: f64,
}

/// Transaction amounts summed per calendar month, oldest month first.
/// Rows whose date does not parse are skipped; missing amounts count as zero.
pub fn monthly_trend(transactions: &Table) -> DashResult<Vec<MonthlyAmount>> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions.decode::<TransactionRecord>()? {
        let Some(date) = txn.transaction_date.as_deref().and_then(parse_date) else {
            log::debug!("skipping transaction with date {:?}", txn.transaction_date);
            continue;
        };
        *months.entry(date.format("%Y-%m").to_string()).or_insert(0.0) +=
            txn.cleaned_transaction_amount.unwrap_or(0.0);
    }
    Ok(months
        .into_iter()
        .map(|(month, amount)| MonthlyAmount { month, amount })
        .collect())
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// `Rp 1,234,567`, rounded to whole rupiah.
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("Rp -{grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn thresholds_are_strict_where_the_dashboard_is() {
        assert_eq!(customer_value_score(1_000_000.0), Rating::Medium);
        assert_eq!(customer_value_score(1_000_000.01), Rating::High);
        assert_eq!(activity_level(50), Rating::Medium);
        assert_eq!(activity_level(51), Rating::High);
        assert_eq!(risk_profile(Some(4.0)), Rating::Low);
        assert_eq!(risk_profile(Some(3.0)), Rating::Medium);
        assert_eq!(risk_profile(None), Rating::Medium);
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0.0), "Rp 0");
        assert_eq!(format_rupiah(999.4), "Rp 999");
        assert_eq!(format_rupiah(1000.0), "Rp 1,000");
        assert_eq!(format_rupiah(1_234_567.6), "Rp 1,234,568");
        assert_eq!(format_rupiah(-2500.0), "Rp -2,500");
    }

    #[test]
    fn monthly_trend_groups_by_month() {
        let mut t = Table::new(["transaction_date", "cleaned_transaction_amount"]);
        t.push_row(vec!["2024-02-03".into(), 10.0.into()]);
        t.push_row(vec!["2024-01-31 23:59:00".into(), 5.0.into()]);
        t.push_row(vec!["2024-02-20".into(), Value::Null]);
        t.push_row(vec!["not a date".into(), 99.0.into()]);
        t.push_row(vec!["2024-02-01".into(), 2.5.into()]);

        let trend = monthly_trend(&t).unwrap();
        assert_eq!(
            trend,
            vec![
                MonthlyAmount { month: "2024-01".into(), amount: 5.0 },
                MonthlyAmount { month: "2024-02".into(), amount: 12.5 },
            ]
        );
    }
}
