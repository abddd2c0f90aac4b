use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Cannot open analytics store at '{path}': {source}")]
    Connection {
        path: String,
        #[source]
        source: Arc<duckdb::Error>,
    },

    #[error("Query error: {0}")]
    Query(#[from] duckdb::Error),

    #[error("Cannot decode row into {target}: {source}")]
    Decode {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid schema identifier '{name}'")]
    InvalidIdentifier { name: String },

    #[error("Analytics store lock poisoned")]
    StorePoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DashResult<T> = Result<T, DashError>;
