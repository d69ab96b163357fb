use crate::stats::{DbStatus, StatsReport};
use serde::Serialize;

/// Value reported for a count whose query failed.
pub const UNAVAILABLE_COUNT: i64 = -1;

/// Body of `GET /info`.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub db_status: DbStatus,
    pub since_start: i64,
    pub last_24_hours: i64,
    pub service_started_at: String,
}

fn count_or_sentinel(count: Option<u64>) -> i64 {
    count.map_or(UNAVAILABLE_COUNT, |count| {
        i64::try_from(count).unwrap_or(i64::MAX)
    })
}

impl From<StatsReport> for InfoResponse {
    fn from(report: StatsReport) -> Self {
        Self {
            db_status: report.db_status,
            since_start: count_or_sentinel(report.since_start),
            last_24_hours: count_or_sentinel(report.last_24_hours),
            service_started_at: report.service_started_at,
        }
    }
}
