//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for every store port
//! - An in-memory store for embedding hosts and tests
//! - A tracing-backed notifier

pub mod duckdb;
pub mod memory;
pub mod notify;
