use crate::{
    error::{DashError, DashResult},
    types::SchemaName,
};
use serde::{Deserialize, Serialize};

/// Where the analytics store lives and which schemas hold its models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// The `.duckdb` file written by the dbt build.
    pub db_path: String,
    /// Schema of the staging models.
    pub staging: SchemaName,
    /// Schema of the mart models.
    pub mart: SchemaName,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::at("my_duckdbt/analytics.duckdb")
    }
}

impl StoreConfig {
    /// Store at `db_path` with the schema names dbt-duckdb gives the
    /// `stg` and `mart` model folders.
    pub fn at(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            staging: "main_stg".into(),
            mart: "main_mart".into(),
        }
    }

    /// Schema names are spliced into SQL text, so they must be plain identifiers.
    pub fn validate(&self) -> DashResult<()> {
        for schema in [&self.staging, &self.mart] {
            if !is_identifier(schema) {
                return Err(DashError::InvalidIdentifier {
                    name: schema.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Rows shown in the "Recent Transactions" table.
    #[serde(default = "default_recent_transactions")]
    pub recent_transactions: usize,
}

fn default_recent_transactions() -> usize {
    10
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            recent_transactions: default_recent_transactions(),
        }
    }
}

impl DashboardConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DashboardConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.store.validate()?;
        Ok(config)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schemas_are_valid() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_schema_with_sql() {
        let mut cfg = StoreConfig::default();
        cfg.mart = "main_mart; DROP TABLE x".into();
        assert!(matches!(
            cfg.validate(),
            Err(DashError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: DashboardConfig = serde_json::from_str(r#"{"recent_transactions": 5}"#).unwrap();
        assert_eq!(cfg.recent_transactions, 5);
        assert_eq!(cfg.store, StoreConfig::default());
    }

    #[test]
    fn store_section_may_name_only_the_file() {
        let cfg: DashboardConfig =
            serde_json::from_str(r#"{"store": {"db_path": "/data/analytics.duckdb"}}"#).unwrap();
        assert_eq!(cfg.store.db_path, "/data/analytics.duckdb");
        assert_eq!(cfg.store.staging, "main_stg");
        assert_eq!(cfg.store.mart, "main_mart");
        assert_eq!(cfg.recent_transactions, 10);
    }
}
