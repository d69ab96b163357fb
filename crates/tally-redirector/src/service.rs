use crate::target::RedirectTarget;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{Clock, NewLogEntry, RedirectCounter, Store, SystemClock};
use tracing::{debug, error, trace, warn, Instrument};

/// Status code of every redirect response (307 Temporary Redirect).
pub const REDIRECT_STATUS: u16 = 307;

/// Default bound for each detached store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata of an inbound redirect request, as written to the request log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub remote_addr: String,
    pub method: String,
    /// Path and query as received.
    pub request_uri: String,
    pub protocol: String,
    pub user_agent: String,
    pub referer: String,
}

/// The outcome of one redirect: the counter value handed to this request
/// and the location it was sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub count: u64,
    pub location: String,
}

/// Handles the redirect path.
///
/// The in-memory counter is authoritative for the response. Each redirect
/// spawns one detached task that increments the durable counter and then
/// appends the request log row. Detached tasks are unordered relative to the
/// response and to each other, are never retried, and each store call is
/// bounded by `store_timeout`.
pub struct RedirectService<S: ?Sized> {
    counter: Arc<RedirectCounter>,
    store: Arc<S>,
    target: RedirectTarget,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl<S: Store + ?Sized> RedirectService<S> {
    pub fn new(counter: Arc<RedirectCounter>, store: Arc<S>, target: RedirectTarget) -> Self {
        Self {
            counter,
            store,
            target,
            clock: Arc::new(SystemClock),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Replaces the clock used to timestamp log entries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn counter(&self) -> &Arc<RedirectCounter> {
        &self.counter
    }

    pub fn target(&self) -> &RedirectTarget {
        &self.target
    }

    /// Claims the next counter value for this request and schedules its
    /// durable bookkeeping. Never fails and never waits on the store.
    ///
    /// Must be called from within a tokio runtime.
    pub fn redirect(&self, meta: RequestMeta) -> Redirection {
        let count = self.counter.increment_and_get();
        let location = self.target.url_for(count);
        debug!(count, location = %location, "redirecting");

        self.persist(count, meta);

        Redirection { count, location }
    }

    fn persist(&self, count: u64, meta: RequestMeta) {
        let store = Arc::clone(&self.store);
        let limit = self.store_timeout;
        let entry = NewLogEntry {
            timestamp: self.clock.now(),
            remote_addr: meta.remote_addr,
            method: meta.method,
            request_uri: meta.request_uri,
            protocol: meta.protocol,
            status_code: REDIRECT_STATUS,
            user_agent: meta.user_agent,
            referer: meta.referer,
        };

        let task = async move {
            match tokio::time::timeout(limit, store.increment_counter()).await {
                Ok(Ok(())) => trace!("durable counter incremented"),
                Ok(Err(err)) => error!(error = %err, "failed to increment durable counter"),
                Err(_) => warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "durable counter increment timed out"
                ),
            }

            match tokio::time::timeout(limit, store.append_log_entry(entry)).await {
                Ok(Ok(())) => trace!("request logged"),
                Ok(Err(err)) => error!(error = %err, "failed to append request log entry"),
                Err(_) => warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "request log append timed out"
                ),
            }
        };

        tokio::spawn(task.instrument(tracing::debug_span!("persist_redirect", count)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use std::collections::HashSet;
    use tally_core::error::Result;
    use tally_core::{InMemoryStore, LogEntry, ManualClock, Page, StatsStore};

    fn target() -> RedirectTarget {
        RedirectTarget::with_default_param("https://example.com/landing").unwrap()
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            remote_addr: "198.51.100.4:40000".to_string(),
            method: "GET".to_string(),
            request_uri: "/?from=qr".to_string(),
            protocol: "HTTP/1.1".to_string(),
            user_agent: "curl/8.5.0".to_string(),
            referer: "https://ref.example/".to_string(),
        }
    }

    fn service(start: u64, store: Arc<InMemoryStore>) -> RedirectService<InMemoryStore> {
        let counter = Arc::new(RedirectCounter::initialize_from(start));
        RedirectService::new(counter, store, target())
    }

    async fn wait_for_appends(store: &InMemoryStore, expected: usize) {
        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async move { store.append_calls() >= expected })
            .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn redirect_embeds_incremented_count() {
        let store = Arc::new(InMemoryStore::with_counter(10));
        let service = service(10, Arc::clone(&store));

        let first = service.redirect(meta());
        let second = service.redirect(meta());

        assert_eq!(first.count, 11);
        assert_eq!(first.location, "https://example.com/landing?cnt=11");
        assert_eq!(second.count, 12);
        assert_eq!(service.counter().get(), 12);
        wait_for_appends(&store, 2).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_redirect_writes_once_each() {
        let store = Arc::new(InMemoryStore::with_counter(0));
        let now = Timestamp::from_second(1_733_185_800).unwrap();
        let service =
            service(0, Arc::clone(&store)).with_clock(Arc::new(ManualClock::new(now)));

        service.redirect(meta());
        wait_for_appends(&store, 1).await;

        assert_eq!(store.increment_calls(), 1);
        assert_eq!(store.append_calls(), 1);
        assert_eq!(store.read_counter().await.unwrap(), 1);

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.timestamp, now);
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.request_uri, "/?from=qr");
        assert_eq!(entry.status_code, REDIRECT_STATUS);
        assert_eq!(entry.remote_addr, "198.51.100.4:40000");
        assert_eq!(entry.referer, "https://ref.example/");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn durable_failure_does_not_touch_memory_counter() {
        let store = Arc::new(InMemoryStore::with_counter(5));
        store.set_available(false);
        let service = service(5, Arc::clone(&store));

        let redirection = service.redirect(meta());
        wait_for_appends(&store, 1).await;

        assert_eq!(redirection.count, 6);
        assert_eq!(service.counter().get(), 6);
        assert_eq!(store.increment_calls(), 1);

        store.set_available(true);
        assert_eq!(store.read_counter().await.unwrap(), 5);
        assert_eq!(store.count_all_log_entries().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_redirects_hand_out_unique_gapless_counts() {
        let start = 100;
        let requests = 200;
        let store = Arc::new(InMemoryStore::with_counter(start));
        let service = Arc::new(service(start, Arc::clone(&store)));

        let handles: Vec<_> = (0..requests)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.redirect(meta()).count })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }

        let expected: HashSet<u64> = (start + 1..=start + requests).collect();
        assert_eq!(seen, expected);

        wait_for_appends(&store, requests as usize).await;
        assert_eq!(store.read_counter().await.unwrap(), start + requests);
    }

    /// Increments never finish; appends go straight through.
    struct StalledCounterStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl StatsStore for StalledCounterStore {
        async fn health_check(&self) -> Result<()> {
            self.inner.health_check().await
        }

        async fn read_counter(&self) -> Result<u64> {
            self.inner.read_counter().await
        }

        async fn count_log_entries(&self, from: Timestamp, to: Timestamp) -> Result<u64> {
            self.inner.count_log_entries(from, to).await
        }

        async fn count_all_log_entries(&self) -> Result<u64> {
            self.inner.count_all_log_entries().await
        }

        async fn list_log_entries(&self, page: Page) -> Result<Vec<LogEntry>> {
            self.inner.list_log_entries(page).await
        }
    }

    #[async_trait]
    impl Store for StalledCounterStore {
        async fn initialize(&self) -> Result<()> {
            self.inner.initialize().await
        }

        async fn increment_counter(&self) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.inner.increment_counter().await
        }

        async fn append_log_entry(&self, entry: NewLogEntry) -> Result<()> {
            self.inner.append_log_entry(entry).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stalled_store_call_is_bounded_by_timeout() {
        let store = Arc::new(StalledCounterStore {
            inner: InMemoryStore::with_counter(0),
        });
        let counter = Arc::new(RedirectCounter::initialize_from(0));
        let service = RedirectService::new(counter, Arc::clone(&store), target())
            .with_store_timeout(Duration::from_millis(50));

        service.redirect(meta());

        let inner = &store.inner;
        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async move { inner.append_calls() == 1 })
            .await;
        assert_eq!(inner.read_counter().await.unwrap(), 0);
    }
}
