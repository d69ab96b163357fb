//! Core types and traits for the Tally redirect counter.
//!
//! This crate provides the counter cache, the request log types and the
//! store contracts shared by the storage backends and the redirector.

pub mod clock;
pub mod counter;
pub mod error;
pub mod log_entry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::RedirectCounter;
pub use error::StoreError;
pub use log_entry::{LogEntry, NewLogEntry, Page};
pub use store::memory::InMemoryStore;
pub use store::{StatsStore, Store};
