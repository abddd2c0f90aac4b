//! DuckDB access layer for the pre-built analytics store.
//!
//! RULE: Only store.rs talks to the database.
//! The catalog hands it SQL text and bound arguments; it never builds SQL.
//!
//! The store is the single `.duckdb` file a dbt-duckdb build writes. Staging
//! and mart models live in schemas of that file (`main_stg`, `main_mart`)
//! and are addressed as `schema.table`. The file is opened read-only.

use crate::{
    catalog::{QueryRequest, TableSource},
    config::StoreConfig,
    error::{DashError, DashResult},
    table::{Table, Value},
};
use chrono::{DateTime, NaiveDate, Utc};
use duckdb::{
    params_from_iter,
    types::{TimeUnit, ValueRef},
    AccessMode, Config, Connection,
};
use std::sync::{Arc, Mutex, OnceLock};

/// Days from 0001-01-01 to the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct AnalyticsStore {
    conn: Connection,
    path: String,
}

impl AnalyticsStore {
    /// Open the store read-only.
    pub fn open(config: &StoreConfig) -> DashResult<Self> {
        config.validate()?;
        connect(config).map_err(|e| DashError::Connection {
            path: config.db_path.clone(),
            source: Arc::new(e),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run one statement with positional text arguments and collect every row.
    pub fn query_table(&self, sql: &str, args: &[&str]) -> DashResult<Table> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut cells: Vec<Vec<Value>> = Vec::new();

        let mut rows = stmt.query(params_from_iter(args.iter().copied()))?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::new();
            // Width is only known once the statement has run; probe until out of range.
            while let Ok(value) = row.get_ref(values.len()) {
                values.push(cell(value));
            }
            cells.push(values);
        }
        drop(rows);

        // Column metadata is available after execution, even for zero rows.
        let mut table = Table::new(stmt.column_names());
        for values in cells {
            table.push_row(values);
        }
        Ok(table)
    }
}

fn connect(config: &StoreConfig) -> duckdb::Result<AnalyticsStore> {
    let flags = Config::default().access_mode(AccessMode::ReadOnly)?;
    let conn = Connection::open_with_flags(&config.db_path, flags)?;
    log::info!(
        "Opened analytics store {} (staging={}, mart={})",
        config.db_path,
        config.staging,
        config.mart
    );
    Ok(AnalyticsStore {
        conn,
        path: config.db_path.clone(),
    })
}

/// DuckDB cell → dashboard cell. Dates and timestamps come back as ISO text.
fn cell(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Integer(i64::from(b)),
        ValueRef::TinyInt(i) => Value::Integer(i.into()),
        ValueRef::SmallInt(i) => Value::Integer(i.into()),
        ValueRef::Int(i) => Value::Integer(i.into()),
        ValueRef::BigInt(i) => Value::Integer(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Integer)
            .unwrap_or(Value::Real(i as f64)),
        ValueRef::UTinyInt(i) => Value::Integer(i.into()),
        ValueRef::USmallInt(i) => Value::Integer(i.into()),
        ValueRef::UInt(i) => Value::Integer(i.into()),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Integer)
            .unwrap_or(Value::Real(i as f64)),
        ValueRef::Float(f) => Value::Real(f.into()),
        ValueRef::Double(f) => Value::Real(f),
        ValueRef::Decimal(d) => {
            let text = d.to_string();
            text.parse().map(Value::Real).unwrap_or(Value::Text(text))
        }
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        ValueRef::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, t) => {
            let micros = match unit {
                TimeUnit::Second => t.checked_mul(1_000_000),
                TimeUnit::Millisecond => t.checked_mul(1_000),
                TimeUnit::Microsecond => Some(t),
                TimeUnit::Nanosecond => Some(t / 1_000),
            };
            micros
                .and_then(DateTime::<Utc>::from_timestamp_micros)
                .map(|ts| Value::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null)
        }
        other => Value::Text(format!("{other:?}")),
    }
}

// ── Connection provider ───────────────────────────────────────────

/// Opens the store on first use and hands out the same handle afterwards.
///
/// A failed open is memoized too: the provider never retries, and every
/// later call reports the same cause.
pub struct ConnectionProvider {
    config: StoreConfig,
    handle: OnceLock<Result<Mutex<AnalyticsStore>, Arc<duckdb::Error>>>,
}

impl ConnectionProvider {
    pub fn new(config: StoreConfig) -> DashResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            handle: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The shared handle, opening it if this is the first call.
    pub fn connection(&self) -> DashResult<&Mutex<AnalyticsStore>> {
        let result = self.handle.get_or_init(|| match connect(&self.config) {
            Ok(store) => Ok(Mutex::new(store)),
            Err(e) => {
                log::error!("Database connection failed: {e}");
                Err(Arc::new(e))
            }
        });
        result.as_ref().map_err(|source| DashError::Connection {
            path: self.config.db_path.clone(),
            source: Arc::clone(source),
        })
    }

    /// Whether an open has been attempted and succeeded.
    pub fn is_connected(&self) -> bool {
        matches!(self.handle.get(), Some(Ok(_)))
    }
}

impl TableSource for ConnectionProvider {
    fn fetch(&self, request: &QueryRequest<'_>) -> DashResult<Table> {
        let store = self
            .connection()?
            .lock()
            .map_err(|_| DashError::StorePoisoned)?;
        log::debug!("Executing {} {:?}", request.operation.name(), request.args);
        store.query_table(request.sql, request.args)
    }
}
