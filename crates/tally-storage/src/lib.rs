//! Durable storage for the redirect counter and request log.

pub mod migration;
pub mod sqlite;

pub use migration::{Migration, Migrator, MIGRATIONS};
pub use sqlite::SqliteStore;
pub use tally_core::{StatsStore, Store, StoreError};
