use std::sync::atomic::{AtomicU64, Ordering};

/// In-process mirror of the durable redirect counter.
///
/// The counter is seeded once from the durable store at startup and then
/// incremented on every redirect without waiting for the durable write.
/// Increments are a single atomic `fetch_add`, so concurrent callers never
/// observe the same value and no update is lost.
///
/// There is no way to re-seed a counter after construction; share it behind
/// an [`Arc`](std::sync::Arc) instead of creating a second one.
#[derive(Debug)]
pub struct RedirectCounter {
    value: AtomicU64,
}

impl RedirectCounter {
    /// Creates a counter holding the value read from the durable store.
    pub fn initialize_from(durable: u64) -> Self {
        Self {
            value: AtomicU64::new(durable),
        }
    }

    /// Atomically increments the counter and returns the new value.
    pub fn increment_and_get(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the current value without mutating it.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }
}
