//! of-db - Data source abstraction layer for Ontoforge
//!
//! This crate provides the `DataSource` trait the extraction pipeline reads
//! schema and data through, and a DuckDB implementation of it.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use crate::duckdb::DuckDbSource;
pub use error::{DbError, DbResult};
pub use traits::{ColumnStats, DataSource, OverlapSample};
