use crate::error::{Result, StoreError};
use crate::log_entry::{LogEntry, NewLogEntry, Page};
use crate::store::{StatsStore, Store};
use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct State {
    initialized: bool,
    counter: Option<u64>,
    entries: Vec<LogEntry>,
}

/// In-memory implementation of the [`Store`] contract.
///
/// Behaves like a freshly created database: the seed counter row only
/// appears after [`Store::initialize`]. Connectivity loss can be simulated
/// with [`InMemoryStore::set_available`], in which case every operation
/// fails with [`StoreError::Unavailable`].
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<State>,
    available: AtomicBool,
    increment_calls: AtomicUsize,
    append_calls: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty, uninitialized store.
    pub fn new() -> Self {
        Self::with_state(State::default())
    }

    /// Creates an initialized store whose counter already holds `value`.
    pub fn with_counter(value: u64) -> Self {
        Self::with_state(State {
            initialized: true,
            counter: Some(value),
            entries: Vec::new(),
        })
    }

    /// Creates an initialized store whose seed row has gone missing.
    pub fn without_seed() -> Self {
        Self::with_state(State {
            initialized: true,
            counter: None,
            entries: Vec::new(),
        })
    }

    fn with_state(state: State) -> Self {
        Self {
            state: RwLock::new(state),
            available: AtomicBool::new(true),
            increment_calls: AtomicUsize::new(0),
            append_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `increment_counter` calls completed, successful or not.
    pub fn increment_calls(&self) -> usize {
        self.increment_calls.load(Ordering::SeqCst)
    }

    /// Number of `append_log_entry` calls completed, successful or not.
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored entry in insertion order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.state.read().entries.clone()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_missing() -> StoreError {
    StoreError::RecordMissing("redirect counter seed row".to_string())
}

#[async_trait]
impl StatsStore for InMemoryStore {
    async fn health_check(&self) -> Result<()> {
        self.ensure_available()
    }

    async fn read_counter(&self) -> Result<u64> {
        self.ensure_available()?;
        self.state.read().counter.ok_or_else(seed_missing)
    }

    async fn count_log_entries(&self, from: Timestamp, to: Timestamp) -> Result<u64> {
        self.ensure_available()?;
        let count = self
            .state
            .read()
            .entries
            .iter()
            .filter(|entry| entry.timestamp >= from && entry.timestamp <= to)
            .count();
        Ok(count as u64)
    }

    async fn count_all_log_entries(&self) -> Result<u64> {
        self.ensure_available()?;
        Ok(self.state.read().entries.len() as u64)
    }

    async fn list_log_entries(&self, page: Page) -> Result<Vec<LogEntry>> {
        self.ensure_available()?;
        let mut entries = self.state.read().entries.clone();
        // newest first; ties broken by id so paging is stable
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(entries
            .into_iter()
            .skip(offset)
            .take(page.size as usize)
            .collect())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn initialize(&self) -> Result<()> {
        self.ensure_available()?;
        let mut state = self.state.write();
        if !state.initialized {
            state.initialized = true;
            state.counter = Some(0);
        }
        Ok(())
    }

    async fn increment_counter(&self) -> Result<()> {
        let result = self.ensure_available().and_then(|()| {
            let mut state = self.state.write();
            let counter = state.counter.as_mut().ok_or_else(seed_missing)?;
            *counter += 1;
            Ok(())
        });
        // counted once the call has taken effect
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn append_log_entry(&self, entry: NewLogEntry) -> Result<()> {
        let result = self.ensure_available().map(|()| {
            let mut state = self.state.write();
            let id = state.entries.len() as i64 + 1;
            state.entries.push(LogEntry::from_new(id, entry));
        });
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::sync::Arc;

    fn entry_at(timestamp: Timestamp) -> NewLogEntry {
        NewLogEntry {
            timestamp,
            remote_addr: "127.0.0.1:5000".to_string(),
            method: "GET".to_string(),
            request_uri: "/".to_string(),
            protocol: "HTTP/1.1".to_string(),
            status_code: 307,
            user_agent: "curl/8.0".to_string(),
            referer: String::new(),
        }
    }

    #[tokio::test]
    async fn initialize_seeds_counter_once() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.read_counter().await,
            Err(StoreError::RecordMissing(_))
        ));

        store.initialize().await.unwrap();
        store.increment_counter().await.unwrap();
        store.initialize().await.unwrap();

        assert_eq!(store.read_counter().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn increment_without_seed_is_record_missing() {
        let store = InMemoryStore::without_seed();
        let err = store.increment_counter().await.unwrap_err();
        assert!(matches!(err, StoreError::RecordMissing(_)));
        assert_eq!(store.increment_calls(), 1);
    }

    #[tokio::test]
    async fn offline_store_fails_every_operation() {
        let store = InMemoryStore::with_counter(3);
        store.set_available(false);

        assert!(store.health_check().await.unwrap_err().is_unavailable());
        assert!(store.read_counter().await.unwrap_err().is_unavailable());
        assert!(store.count_all_log_entries().await.unwrap_err().is_unavailable());
        assert!(store.increment_counter().await.unwrap_err().is_unavailable());

        store.set_available(true);
        assert_eq!(store.read_counter().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn counts_inclusive_window() {
        let store = InMemoryStore::with_counter(0);
        let now = Timestamp::from_second(1_700_000_000).unwrap();

        for hours in [30, 12, 1] {
            store
                .append_log_entry(entry_at(now - SignedDuration::from_hours(hours)))
                .await
                .unwrap();
        }
        store
            .append_log_entry(entry_at(now - SignedDuration::from_hours(24)))
            .await
            .unwrap();

        let from = now - SignedDuration::from_hours(24);
        assert_eq!(store.count_log_entries(from, now).await.unwrap(), 3);
        assert_eq!(store.count_all_log_entries().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn list_pages_newest_first() {
        let store = InMemoryStore::with_counter(0);
        let now = Timestamp::from_second(1_700_000_000).unwrap();

        for minutes in [3, 1, 2] {
            store
                .append_log_entry(entry_at(now - SignedDuration::from_mins(minutes)))
                .await
                .unwrap();
        }

        let first = store.list_log_entries(Page::new(1, 2).unwrap()).await.unwrap();
        let ids: Vec<i64> = first.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let second = store.list_log_entries(Page::new(2, 2).unwrap()).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryStore::with_counter(0));
        let mut handles = vec![];

        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.increment_counter().await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.read_counter().await.unwrap(), 50);
    }
}
