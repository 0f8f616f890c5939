//! Storage layer
//!
//! SQLite pool, embedded schema, and two `EnvStore` implementations: the
//! production SQLite store and an in-memory store for tests.

pub mod memory;
pub mod pool;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryEnvStore;
pub use pool::{create_pool, create_test_pool, DbPool};
pub use sqlite::SqliteEnvStore;
