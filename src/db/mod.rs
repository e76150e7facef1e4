//! Database layer
//!
//! Connection pooling, code-embedded migrations and repositories for the
//! Spotmark service. Both SQLite and MySQL backends are supported behind
//! the `DatabasePool` trait.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
