//! Database layer
//!
//! Storage access for the blog site:
//! - SQLite (default, single-binary deployment)
//! - MySQL (selected by configuration)
//!
//! The `DatabasePool` trait hides the concrete driver; repositories dispatch
//! on `driver()` and run the matching per-driver query functions.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
