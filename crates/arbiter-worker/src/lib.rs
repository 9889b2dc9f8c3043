//! Arbiter batch worker library
//!
//! Reads a JSON-lines file of records, validates each against its table,
//! stores it in the record store and decides it against the live scenarios.

pub mod config;
pub mod error;
pub mod ingest;
