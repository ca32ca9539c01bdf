//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - Repository layer for the wallet vault entry and run history

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{Repository, RunRecord};
