//! Tabular query results.
//!
//! A `Table` is what every catalog operation hands to the presentation
//! layer: named, typed columns and rows in the order the statement produced.

use crate::error::{DashError, DashResult};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Unknown,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Real,
            Value::Text(_) => ColumnType::Text,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => serde_json::Value::from(*i),
            // Whole reals decode into integer fields too (counts stored as REAL).
            Value::Real(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                serde_json::Value::from(*f as i64)
            }
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Blob(b) => serde_json::Value::from(b.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Storage class of a column, taken from the first non-null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(column_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: column_names
                .into_iter()
                .map(|name| Column {
                    name: name.into(),
                    kind: ColumnType::Unknown,
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Table with no columns and no rows; what a failed operation returns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a row. Panics if the arity does not match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row arity does not match column count"
        );
        for (col, value) in self.columns.iter_mut().zip(&row) {
            if col.kind == ColumnType::Unknown {
                col.kind = value.column_type();
            }
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, top to bottom. Empty if the column is absent.
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let idx = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |r| idx.map(|i| &r[i]))
    }

    /// Append a column computed from an existing one, row by row.
    /// If the source column is absent every row sees `Value::Null`.
    pub fn derive_column<F>(&mut self, name: &str, source: &str, f: F)
    where
        F: Fn(&Value) -> Value,
    {
        let idx = self.column_index(source);
        let mut kind = ColumnType::Unknown;
        for row in &mut self.rows {
            let derived = f(idx.map(|i| &row[i]).unwrap_or(&Value::Null));
            if kind == ColumnType::Unknown {
                kind = derived.column_type();
            }
            row.push(derived);
        }
        self.columns.push(Column {
            name: name.to_string(),
            kind,
        });
    }

    /// First `n` rows restricted to the named columns (absent names are skipped).
    pub fn head(&self, n: usize, columns: &[&str]) -> Table {
        let picks: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        Table {
            columns: picks.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .take(n)
                .map(|r| picks.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Decode every row into `T` by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> DashResult<Vec<T>> {
        self.rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| (c.name.clone(), v.to_json()))
                    .collect();
                serde_json::from_value(serde_json::Value::Object(object)).map_err(|source| {
                    DashError::Decode {
                        target: std::any::type_name::<T>(),
                        source,
                    }
                })
            })
            .collect()
    }
}
