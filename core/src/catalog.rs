//! The query catalog: the six read operations behind the dashboard.
//!
//! Every operation is one parameterized statement against the staging or
//! mart namespace. Results pass through the `ResultCache`, and failures are
//! contained here: callers always get a `QueryOutcome`, never an error.
//!
//! Summary operations read the mart tables as-is. Totals are owned by the
//! batch pipeline and are not recomputed from staging rows.

use crate::{
    cache::{CacheKey, ResultCache},
    config::StoreConfig,
    error::{DashError, DashResult},
    segment::{holding_status_cell, income_segment_cell},
    store::ConnectionProvider,
    table::Table,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListCustomers,
    Profile,
    Portfolio,
    Transactions,
    PortfolioSummary,
    TransactionSummary,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ListCustomers,
        Operation::Profile,
        Operation::Portfolio,
        Operation::Transactions,
        Operation::PortfolioSummary,
        Operation::TransactionSummary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::ListCustomers => "list_customers",
            Operation::Profile => "get_profile",
            Operation::Portfolio => "get_portfolio",
            Operation::Transactions => "get_transactions",
            Operation::PortfolioSummary => "get_portfolio_summary",
            Operation::TransactionSummary => "get_transaction_summary",
        }
    }

    /// Every operation but the customer list is scoped to one customer.
    pub fn takes_customer(self) -> bool {
        !matches!(self, Operation::ListCustomers)
    }

    fn sql(self, stg: &str, mart: &str) -> String {
        match self {
            Operation::ListCustomers => format!(
                "SELECT DISTINCT p.customer_id, p.gender, p.income_bracket, p.income_level
                 FROM {stg}.stg_profile p
                 ORDER BY p.customer_id"
            ),
            Operation::Profile => format!(
                "SELECT DISTINCT customer_id, gender, income_bracket, income_level
                 FROM {stg}.stg_profile
                 WHERE customer_id = ?"
            ),
            Operation::Portfolio => format!(
                "SELECT product_name, product_category, cleaned_amount
                 FROM {stg}.stg_porto
                 WHERE customer_id = ?
                 ORDER BY cleaned_amount DESC, product_name, product_category"
            ),
            Operation::Transactions => format!(
                "SELECT transaction_date, transaction_method, transaction_type,
                        cleaned_transaction_amount, transaction_year, transaction_month,
                        transaction_day_of_week
                 FROM {stg}.stg_transaction
                 WHERE customer_id = ?
                 ORDER BY transaction_date DESC, transaction_method, transaction_type"
            ),
            Operation::PortfolioSummary => format!(
                "SELECT product_category, product_count, total_amount, avg_amount,
                        max_amount, min_amount, portfolio_percentage
                 FROM {mart}.customer_portfolio_summary
                 WHERE customer_id = ?
                 ORDER BY total_amount DESC, product_category"
            ),
            Operation::TransactionSummary => format!(
                "SELECT total_transactions, total_spent, avg_transaction_amount,
                        max_transaction_amount, min_transaction_amount,
                        payment_methods_used, transaction_types_used,
                        first_transaction_date, last_transaction_date,
                        transactions_per_day
                 FROM {mart}.customer_transaction_analysis
                 WHERE customer_id = ?"
            ),
        }
    }

    /// Columns computed in Rust after the statement runs.
    fn derive_columns(self, table: &mut Table) {
        match self {
            Operation::ListCustomers | Operation::Profile => {
                table.derive_column("income_segment", "income_level", income_segment_cell)
            }
            Operation::Portfolio => table.derive_column("status", "cleaned_amount", holding_status_cell),
            _ => {}
        }
    }
}

/// One statement ready to run, handed to a `TableSource`.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub operation: Operation,
    pub sql: &'a str,
    pub args: &'a [&'a str],
}

/// Where catalog statements are executed. `ConnectionProvider` is the real
/// one; tests substitute counting or failing sources.
pub trait TableSource: Send + Sync {
    fn fetch(&self, request: &QueryRequest<'_>) -> DashResult<Table>;
}

impl<T: TableSource + ?Sized> TableSource for Arc<T> {
    fn fetch(&self, request: &QueryRequest<'_>) -> DashResult<Table> {
        (**self).fetch(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The store could not be opened.
    Connection,
    /// The store is open but the statement failed.
    Query,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QueryStatus {
    Ok,
    Failed { kind: FailureKind, message: String },
}

/// What every catalog operation returns.
///
/// A failed outcome always carries an empty table; an `Ok` outcome may also
/// be empty, meaning the customer simply has no such rows.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub operation: Operation,
    pub table: Arc<Table>,
    pub status: QueryStatus,
    /// Served from the cache without touching storage.
    pub cached: bool,
}

impl QueryOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, QueryStatus::Ok)
    }

    pub fn is_failed(&self) -> bool {
        !self.is_ok()
    }

    /// Ok with zero rows.
    pub fn is_no_data(&self) -> bool {
        self.is_ok() && self.table.is_empty()
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            QueryStatus::Ok => None,
            QueryStatus::Failed { message, .. } => Some(message),
        }
    }

    fn failed(operation: Operation, error: &DashError) -> Self {
        let kind = match error {
            DashError::Connection { .. } => FailureKind::Connection,
            _ => FailureKind::Query,
        };
        Self {
            operation,
            table: Arc::new(Table::empty()),
            status: QueryStatus::Failed {
                kind,
                message: error.to_string(),
            },
            cached: false,
        }
    }
}

struct Statements {
    sql: [String; 6],
}

impl Statements {
    fn build(stg: &str, mart: &str) -> Self {
        Self {
            sql: Operation::ALL.map(|op| op.sql(stg, mart)),
        }
    }

    // `ALL` lists the variants in declaration order.
    fn get(&self, op: Operation) -> &str {
        &self.sql[op as usize]
    }
}

pub struct QueryCatalog {
    source: Box<dyn TableSource>,
    cache: ResultCache,
    statements: Statements,
}

impl QueryCatalog {
    /// Catalog backed by the real store. The store is opened on first query.
    pub fn open(config: StoreConfig) -> DashResult<Self> {
        let statements = Statements::build(&config.staging, &config.mart);
        let provider = ConnectionProvider::new(config)?;
        Ok(Self {
            source: Box::new(provider),
            cache: ResultCache::new(),
            statements,
        })
    }

    /// Catalog over any source, with schema names taken from `config`.
    pub fn with_source(source: Box<dyn TableSource>, config: &StoreConfig) -> DashResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            cache: ResultCache::new(),
            statements: Statements::build(&config.staging, &config.mart),
        })
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// SQL text of one operation, as sent to the source.
    pub fn statement(&self, op: Operation) -> &str {
        self.statements.get(op)
    }

    pub fn list_customers(&self) -> QueryOutcome {
        self.run(Operation::ListCustomers, None)
    }

    pub fn get_profile(&self, customer_id: &str) -> QueryOutcome {
        self.run(Operation::Profile, Some(customer_id))
    }

    pub fn get_portfolio(&self, customer_id: &str) -> QueryOutcome {
        self.run(Operation::Portfolio, Some(customer_id))
    }

    pub fn get_transactions(&self, customer_id: &str) -> QueryOutcome {
        self.run(Operation::Transactions, Some(customer_id))
    }

    pub fn get_portfolio_summary(&self, customer_id: &str) -> QueryOutcome {
        self.run(Operation::PortfolioSummary, Some(customer_id))
    }

    pub fn get_transaction_summary(&self, customer_id: &str) -> QueryOutcome {
        self.run(Operation::TransactionSummary, Some(customer_id))
    }

    fn run(&self, operation: Operation, customer_id: Option<&str>) -> QueryOutcome {
        let key = CacheKey::new(operation, customer_id);
        let result = self.cache.get_or_fetch(key, || {
            let args: Vec<&str> = customer_id.into_iter().collect();
            let request = QueryRequest {
                operation,
                sql: self.statements.get(operation),
                args: &args,
            };
            let mut table = self.source.fetch(&request)?;
            operation.derive_columns(&mut table);
            Ok(table)
        });

        match result {
            Ok((table, cached)) => QueryOutcome {
                operation,
                table,
                status: QueryStatus::Ok,
                cached,
            },
            Err(e) => {
                log::warn!("Error loading {}: {e}", operation.name());
                QueryOutcome::failed(operation, &e)
            }
        }
    }
}
