use crate::config::ServiceConfig;
use crate::cors::CorsPolicy;
use crate::service::RedirectService;
use crate::stats::StatsReporter;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{Clock, RedirectCounter, Store, SystemClock};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    redirects: Arc<RedirectService<dyn Store>>,
    stats: Arc<StatsReporter<dyn Store>>,
    cors: CorsPolicy,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(counter: Arc<RedirectCounter>, store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        Self::with_clock(counter, store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        counter: Arc<RedirectCounter>,
        store: Arc<dyn Store>,
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let redirects = RedirectService::new(counter, Arc::clone(&store), config.target)
            .with_store_timeout(config.store_timeout)
            .with_clock(Arc::clone(&clock));
        let stats = StatsReporter::new(store, config.service_started_at)
            .with_clock(clock)
            .with_query_timeout(config.stats_timeout);

        Self {
            redirects: Arc::new(redirects),
            stats: Arc::new(stats),
            cors: config.cors,
            request_timeout: config.request_timeout,
        }
    }

    pub fn redirects(&self) -> &RedirectService<dyn Store> {
        &self.redirects
    }

    pub fn stats(&self) -> &StatsReporter<dyn Store> {
        &self.stats
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
