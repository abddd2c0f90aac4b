//! Shared primitive types used across the dashboard core.

/// A customer identifier as selected by the operator.
/// Bound as text; DuckDB casts the parameter when the key column is numeric.
pub type CustomerId = String;

/// A SQL schema name (`main_stg`, `main_mart`, ...).
pub type SchemaName = String;
