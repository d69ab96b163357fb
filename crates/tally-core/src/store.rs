pub mod memory;

use crate::error::Result;
use crate::log_entry::{LogEntry, NewLogEntry, Page};
use async_trait::async_trait;
use jiff::Timestamp;

/// The read side of the durable store.
///
/// This trait carries only the queries the stats reporter needs, so the
/// info path can be given read-only access.
#[async_trait]
pub trait StatsStore: Send + Sync + 'static {
    /// Succeeds iff a round-trip to the store succeeds.
    async fn health_check(&self) -> Result<()>;

    /// Returns the current durable counter value.
    /// Returns `Err(RecordMissing)` if the seed row is absent.
    async fn read_counter(&self) -> Result<u64>;

    /// Counts log entries with a timestamp in `[from, to]`, both ends inclusive.
    async fn count_log_entries(&self, from: Timestamp, to: Timestamp) -> Result<u64>;

    /// Counts every log entry.
    async fn count_all_log_entries(&self) -> Result<u64>;

    /// Lists log entries, newest timestamp first.
    async fn list_log_entries(&self, page: Page) -> Result<Vec<LogEntry>>;
}

#[async_trait]
pub trait Store: StatsStore {
    /// Applies pending schema migrations. Idempotent on a current schema.
    async fn initialize(&self) -> Result<()>;

    /// Atomically adds one to the durable counter.
    /// Returns `Err(RecordMissing)` if no row was affected.
    async fn increment_counter(&self) -> Result<()>;

    /// Appends one immutable request log row.
    async fn append_log_entry(&self, entry: NewLogEntry) -> Result<()>;
}
