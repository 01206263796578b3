//! db-browser - Runs SQL against a relational database and projects every
//! result set into rows of display text.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod status;
