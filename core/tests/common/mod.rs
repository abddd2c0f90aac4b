//! Shared fixtures for the integration tests.
//!
//! Each fixture store is a DuckDB file in its own temp directory, removed on drop.

#![allow(dead_code)]

use customer360_core::{
    catalog::{Operation, QueryRequest, TableSource},
    config::StoreConfig,
    error::{DashError, DashResult},
    table::Table,
};
use duckdb::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FixtureStore {
    pub dir: PathBuf,
    pub config: StoreConfig,
}

impl FixtureStore {
    /// Build the analytics file with its staging and mart schemas.
    pub fn build() -> Self {
        Self::build_with("")
    }

    /// Like `build`, then run `adjust` against the seeded file.
    pub fn build_with(adjust: &str) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = std::env::temp_dir().join(format!("customer360-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create fixture dir");
        let path = dir.join("analytics.duckdb");
        let config = StoreConfig::at(path.to_str().expect("utf-8 temp dir"));

        // The seeding connection must be closed before the read-only open.
        {
            let conn = Connection::open(&path).expect("create fixture db");
            for sql in [
                include_str!("../fixtures/staging.sql"),
                include_str!("../fixtures/mart.sql"),
                adjust,
            ]
            .into_iter()
            .filter(|sql| !sql.trim().is_empty())
            {
                conn.execute_batch(sql).expect("seed fixture db");
            }
        }
        Self { dir, config }
    }
}

impl Drop for FixtureStore {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

// ── Stub sources ────────────────────────────────────────────────────

/// Serves canned tables and counts how often storage is hit.
pub struct CountingSource {
    calls: AtomicUsize,
    seen: Mutex<Vec<(Operation, Vec<String>)>>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(Operation, Vec<String>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl TableSource for CountingSource {
    fn fetch(&self, request: &QueryRequest<'_>) -> DashResult<Table> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            request.operation,
            request.args.iter().map(|a| a.to_string()).collect(),
        ));
        Ok(canned_table(request.operation, request.args.first().copied()))
    }
}

/// Fails the first `failures` calls with a storage fault, then serves canned tables.
pub struct FlakySource {
    remaining_failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakySource {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TableSource for FlakySource {
    fn fetch(&self, request: &QueryRequest<'_>) -> DashResult<Table> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DashError::Other(anyhow::anyhow!("simulated disk I/O error")));
        }
        Ok(canned_table(request.operation, request.args.first().copied()))
    }
}

/// Minimal rows with the real column names of each operation.
pub fn canned_table(op: Operation, customer_id: Option<&str>) -> Table {
    let id = customer_id.unwrap_or("C1");
    match op {
        Operation::ListCustomers => {
            let mut t = Table::new(["customer_id", "gender", "income_bracket", "income_level"]);
            t.push_row(vec!["C1".into(), "F".into(), "5-10 Juta".into(), 5i64.into()]);
            t.push_row(vec!["C2".into(), "M".into(), "<3 Juta".into(), 2i64.into()]);
            t
        }
        Operation::Profile => {
            let mut t = Table::new(["customer_id", "gender", "income_bracket", "income_level"]);
            t.push_row(vec![id.into(), "F".into(), "5-10 Juta".into(), 5i64.into()]);
            t
        }
        Operation::Portfolio => {
            let mut t = Table::new(["product_name", "product_category", "cleaned_amount"]);
            t.push_row(vec!["Tabungan Plus".into(), "Savings".into(), 500000.0.into()]);
            t.push_row(vec!["Deposito 3M".into(), "Deposit".into(), 0.0.into()]);
            t
        }
        Operation::Transactions => {
            let mut t = Table::new([
                "transaction_date",
                "transaction_method",
                "transaction_type",
                "cleaned_transaction_amount",
            ]);
            t.push_row(vec!["2024-02-20".into(), "Transfer".into(), "Bill Payment".into(), 250000.0.into()]);
            t
        }
        Operation::PortfolioSummary => {
            let mut t = Table::new(["product_category", "total_amount"]);
            t.push_row(vec!["Savings".into(), 500000.0.into()]);
            t
        }
        Operation::TransactionSummary => {
            let mut t = Table::new(["total_transactions", "total_spent"]);
            t.push_row(vec![60i64.into(), 1200000.0.into()]);
            t
        }
    }
}
