use crate::cors::CorsPolicy;
use crate::service::DEFAULT_STORE_TIMEOUT;
use crate::stats::DEFAULT_QUERY_TIMEOUT;
use crate::target::RedirectTarget;
use jiff::Timestamp;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Upper bound on handling a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings of the redirect service.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServiceConfig {
    /// Where every redirect points.
    pub target: RedirectTarget,
    #[builder(default)]
    pub cors: CorsPolicy,
    /// Bound for each detached store call made per redirect.
    #[builder(default = DEFAULT_STORE_TIMEOUT)]
    pub store_timeout: Duration,
    /// Bound for each store query behind the info endpoint. Must stay below
    /// `request_timeout`.
    #[builder(default = DEFAULT_QUERY_TIMEOUT)]
    pub stats_timeout: Duration,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    /// Marker reported verbatim by the info endpoint.
    #[builder(default = Timestamp::now().to_string(), setter(into))]
    pub service_started_at: String,
}
