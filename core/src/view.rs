//! Assembly of everything the dashboard shows for one customer.
//!
//! The view is a plain data structure; rendering it (text, JSON, a UI) is
//! the caller's business. Each section keeps its `QueryOutcome` so a
//! renderer can tell "no rows" from "query failed". Rows that come back
//! but cannot be decoded are reported in the section's `error` and leave
//! its derived metrics empty; they never fail the whole view.

use crate::{
    catalog::{QueryCatalog, QueryOutcome},
    error::DashResult,
    insights::{monthly_trend, CustomerInsights, MonthlyAmount, PortfolioOverview, TransactionOverview},
    model::CustomerRecord,
    table::Table,
};
use serde::Serialize;

/// Columns of the "Product Details" table.
pub const PRODUCT_COLUMNS: [&str; 4] = ["product_name", "product_category", "cleaned_amount", "status"];

/// Columns of the "Recent Transactions" table.
pub const RECENT_TRANSACTION_COLUMNS: [&str; 4] = [
    "transaction_date",
    "transaction_method",
    "transaction_type",
    "cleaned_transaction_amount",
];

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSection {
    pub outcome: QueryOutcome,
    pub customer: Option<CustomerRecord>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSection {
    pub holdings: QueryOutcome,
    pub summary: QueryOutcome,
    /// Present when both holdings and summary have rows.
    pub overview: Option<PortfolioOverview>,
    pub products: Table,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSection {
    pub transactions: QueryOutcome,
    pub summary: QueryOutcome,
    pub overview: Option<TransactionOverview>,
    pub monthly: Vec<MonthlyAmount>,
    pub recent: Table,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer360View {
    pub customer_id: String,
    pub profile: ProfileSection,
    pub portfolio: PortfolioSection,
    pub transactions: TransactionSection,
    pub insights: Option<CustomerInsights>,
}

impl Customer360View {
    /// Run every customer-scoped operation and derive the section metrics.
    ///
    /// Never fails: query failures stay in the section outcomes and decode
    /// failures in the section errors.
    pub fn load(catalog: &QueryCatalog, customer_id: &str, recent_limit: usize) -> Self {
        let profile = Self::load_profile(catalog, customer_id);
        let portfolio = Self::load_portfolio(catalog, customer_id);
        let transactions = Self::load_transactions(catalog, customer_id, recent_limit);

        let income_level = profile.customer.as_ref().and_then(|c| c.income_level);
        let insights = contained(
            "insights",
            CustomerInsights::compute(
                &portfolio.summary.table,
                &transactions.summary.table,
                income_level,
            ),
            &mut None,
        )
        .flatten();

        Self {
            customer_id: customer_id.to_string(),
            profile,
            portfolio,
            transactions,
            insights,
        }
    }

    fn load_profile(catalog: &QueryCatalog, customer_id: &str) -> ProfileSection {
        let outcome = catalog.get_profile(customer_id);
        let mut error = None;
        let customer = contained("profile", outcome.table.decode::<CustomerRecord>(), &mut error)
            .and_then(|records| records.into_iter().next());
        ProfileSection {
            outcome,
            customer,
            error,
        }
    }

    fn load_portfolio(catalog: &QueryCatalog, customer_id: &str) -> PortfolioSection {
        let holdings = catalog.get_portfolio(customer_id);
        let summary = catalog.get_portfolio_summary(customer_id);
        let mut error = None;
        let overview = if holdings.table.is_empty() || summary.table.is_empty() {
            None
        } else {
            contained(
                "portfolio overview",
                PortfolioOverview::compute(&holdings.table, &summary.table),
                &mut error,
            )
        };
        let products = holdings.table.head(holdings.table.len(), &PRODUCT_COLUMNS);
        PortfolioSection {
            holdings,
            summary,
            overview,
            products,
            error,
        }
    }

    fn load_transactions(
        catalog: &QueryCatalog,
        customer_id: &str,
        recent_limit: usize,
    ) -> TransactionSection {
        let transactions = catalog.get_transactions(customer_id);
        let summary = catalog.get_transaction_summary(customer_id);
        let mut error = None;
        let overview = if transactions.table.is_empty() {
            None
        } else {
            contained(
                "transaction overview",
                TransactionOverview::from_summary(&summary.table),
                &mut error,
            )
            .flatten()
        };
        let monthly = contained("monthly trend", monthly_trend(&transactions.table), &mut error)
            .unwrap_or_default();
        let recent = transactions
            .table
            .head(recent_limit, &RECENT_TRANSACTION_COLUMNS);
        TransactionSection {
            transactions,
            summary,
            overview,
            monthly,
            recent,
            error,
        }
    }

    /// Every outcome in the view, in display order.
    pub fn outcomes(&self) -> [&QueryOutcome; 5] {
        [
            &self.profile.outcome,
            &self.portfolio.holdings,
            &self.portfolio.summary,
            &self.transactions.transactions,
            &self.transactions.summary,
        ]
    }

    /// Section-level decode errors, in display order.
    pub fn section_errors(&self) -> impl Iterator<Item = &str> {
        [
            &self.profile.error,
            &self.portfolio.error,
            &self.transactions.error,
        ]
        .into_iter()
        .filter_map(|e| e.as_deref())
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes().iter().any(|o| o.is_failed()) || self.section_errors().next().is_some()
    }
}

/// Keep a decode failure inside its section: log it, record the first one, yield `None`.
fn contained<T>(what: &str, result: DashResult<T>, error: &mut Option<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Cannot build {what}: {e}");
            error.get_or_insert_with(|| e.to_string());
            None
        }
    }
}
