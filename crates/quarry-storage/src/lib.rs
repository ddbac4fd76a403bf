//! # quarry-storage
//!
//! SQLite persistence for translation and execution history.
//! WAL mode, one writer plus round-robin readers, versioned migrations,
//! and age-based pruning of execution records.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;
pub mod retention;
pub mod schema;

pub use engine::SqliteHistoryStore;
pub use pool::ConnectionPool;
