//! SQL to Elasticsearch Query DSL translation
//!
//! This library compiles a restricted SQL dialect (a single SELECT statement)
//! into an Elasticsearch Query DSL document.

pub mod config;
pub mod server;
pub mod sql;

// Re-export main API
pub use sql::{compile, SqlError, SqlResult};
