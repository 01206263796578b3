//! Integration tests for db-browser.

pub mod cli_test;
pub mod connection_test;
pub mod query_test;
