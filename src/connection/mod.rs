//! Connection management for db-browser.
//!
//! Centralizes the session lifecycle.

pub mod manager;

pub use manager::{ActiveSession, ConnectionManager};
