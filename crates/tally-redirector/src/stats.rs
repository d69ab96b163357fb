use jiff::SignedDuration;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tally_core::error::Result;
use tally_core::{Clock, StatsStore, StoreError, SystemClock};
use tracing::error;

/// Width of the rolling window reported as `last_24_hours`.
pub const ROLLING_WINDOW: SignedDuration = SignedDuration::from_secs(24 * 60 * 60);

/// Default bound for each stats query. Kept under the request timeout so a
/// slow store blanks a field instead of failing the response.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbStatus {
    Ok,
    Error,
}

/// Aggregate statistics as seen by the durable store.
///
/// `None` marks a query that failed; the other fields are still valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub db_status: DbStatus,
    pub since_start: Option<u64>,
    pub last_24_hours: Option<u64>,
    pub service_started_at: String,
}

/// Answers the info endpoint from the durable store.
///
/// The counter cache is deliberately not consulted so that drift between
/// the in-memory and durable counts stays observable.
pub struct StatsReporter<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    service_started_at: String,
    query_timeout: Duration,
}

impl<S: StatsStore + ?Sized> StatsReporter<S> {
    pub fn new(store: Arc<S>, service_started_at: impl Into<String>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            service_started_at: service_started_at.into(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn bounded<T>(&self, query: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.query_timeout, query)
            .await
            .unwrap_or_else(|_| {
                Err(StoreError::Timeout(format!(
                    "stats query exceeded {}ms",
                    self.query_timeout.as_millis()
                )))
            })
    }

    /// Runs the health check and both counts concurrently, each bounded by
    /// the query timeout. Each failure is logged and only blanks its own
    /// field.
    pub async fn report(&self) -> StatsReport {
        let now = self.clock.now();
        let from = now - ROLLING_WINDOW;

        let (health, last_24_hours, since_start) = tokio::join!(
            self.bounded(self.store.health_check()),
            self.bounded(self.store.count_log_entries(from, now)),
            self.bounded(self.store.count_all_log_entries()),
        );

        let db_status = match health {
            Ok(()) => DbStatus::Ok,
            Err(err) => {
                error!(error = %err, "store health check failed");
                DbStatus::Error
            }
        };

        let last_24_hours = last_24_hours
            .inspect_err(|err| error!(error = %err, "failed to count redirects in last 24 hours"))
            .ok();
        let since_start = since_start
            .inspect_err(|err| error!(error = %err, "failed to count all request logs"))
            .ok();

        StatsReport {
            db_status,
            since_start,
            last_24_hours,
            service_started_at: self.service_started_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use tally_core::{InMemoryStore, LogEntry, ManualClock, NewLogEntry, Page, Store};

    fn entry_at(timestamp: Timestamp) -> NewLogEntry {
        NewLogEntry {
            timestamp,
            remote_addr: String::new(),
            method: "GET".to_string(),
            request_uri: "/".to_string(),
            protocol: "HTTP/1.1".to_string(),
            status_code: 307,
            user_agent: String::new(),
            referer: String::new(),
        }
    }

    fn now() -> Timestamp {
        Timestamp::from_second(1_733_185_800).unwrap()
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::with_counter(3));
        for hours in [30, 12, 1] {
            store
                .append_log_entry(entry_at(now() - SignedDuration::from_hours(hours)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn reports_window_and_total_counts() {
        let store = seeded_store().await;
        let reporter = StatsReporter::new(store, "2024-12-03 00:30")
            .with_clock(Arc::new(ManualClock::new(now())));

        let report = reporter.report().await;

        assert_eq!(report.db_status, DbStatus::Ok);
        assert_eq!(report.last_24_hours, Some(2));
        assert_eq!(report.since_start, Some(3));
        assert_eq!(report.service_started_at, "2024-12-03 00:30");
    }

    #[tokio::test]
    async fn window_follows_the_clock() {
        let store = seeded_store().await;
        let clock = Arc::new(ManualClock::new(now()));
        let reporter = StatsReporter::new(store, "boot").with_clock(clock.clone());

        clock.advance(SignedDuration::from_hours(12));
        let report = reporter.report().await;

        assert_eq!(report.last_24_hours, Some(2));
        clock.advance(SignedDuration::from_hours(13));
        assert_eq!(reporter.report().await.last_24_hours, Some(0));
    }

    #[tokio::test]
    async fn unavailable_store_blanks_every_field() {
        let store = seeded_store().await;
        store.set_available(false);
        let reporter = StatsReporter::new(store, "boot");

        let report = reporter.report().await;

        assert_eq!(report.db_status, DbStatus::Error);
        assert_eq!(report.last_24_hours, None);
        assert_eq!(report.since_start, None);
        assert_eq!(report.service_started_at, "boot");
    }

    /// Delegates to an in-memory store, except that the window count fails
    /// and the total count stalls.
    struct PartlyBrokenStore {
        inner: Arc<InMemoryStore>,
        window_fails: bool,
        total_stalls: bool,
    }

    #[async_trait]
    impl StatsStore for PartlyBrokenStore {
        async fn health_check(&self) -> Result<()> {
            self.inner.health_check().await
        }

        async fn read_counter(&self) -> Result<u64> {
            self.inner.read_counter().await
        }

        async fn count_log_entries(&self, from: Timestamp, to: Timestamp) -> Result<u64> {
            if self.window_fails {
                return Err(StoreError::Query("window count failed".to_string()));
            }
            self.inner.count_log_entries(from, to).await
        }

        async fn count_all_log_entries(&self) -> Result<u64> {
            if self.total_stalls {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.inner.count_all_log_entries().await
        }

        async fn list_log_entries(&self, page: Page) -> Result<Vec<LogEntry>> {
            self.inner.list_log_entries(page).await
        }
    }

    #[tokio::test]
    async fn failed_window_count_blanks_only_its_field() {
        let store = Arc::new(PartlyBrokenStore {
            inner: seeded_store().await,
            window_fails: true,
            total_stalls: false,
        });
        let reporter = StatsReporter::new(store, "boot");

        let report = reporter.report().await;

        assert_eq!(report.db_status, DbStatus::Ok);
        assert_eq!(report.last_24_hours, None);
        assert_eq!(report.since_start, Some(3));
    }

    #[tokio::test]
    async fn stalled_query_is_cut_off_by_query_timeout() {
        let store = Arc::new(PartlyBrokenStore {
            inner: seeded_store().await,
            window_fails: false,
            total_stalls: true,
        });
        let reporter = StatsReporter::new(store, "boot")
            .with_clock(Arc::new(ManualClock::new(now())))
            .with_query_timeout(Duration::from_millis(50));

        let report = tokio::time::timeout(Duration::from_secs(5), reporter.report())
            .await
            .unwrap();

        assert_eq!(report.db_status, DbStatus::Ok);
        assert_eq!(report.last_24_hours, Some(2));
        assert_eq!(report.since_start, None);
    }

    #[test]
    fn db_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DbStatus::Ok).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&DbStatus::Error).unwrap(), "\"error\"");
    }
}
