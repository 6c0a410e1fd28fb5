//! Integration tests for sqlite-unsafe.

pub mod cli_test;
pub mod query_test;
