//! sqlite-unsafe - run one SQL statement against a SQLite file inside a
//! locked-down process.
//!
//! This library exposes the core modules for use in integration tests.

pub mod app;
pub mod cli;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod sandbox;
