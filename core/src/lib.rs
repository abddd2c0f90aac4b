//! Customer 360 dashboard core: read-only queries over a pre-built
//! analytics store, memoized per argument.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod insights;
pub mod model;
pub mod segment;
pub mod store;
pub mod table;
pub mod types;
pub mod view;
