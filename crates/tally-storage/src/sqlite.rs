use crate::migration::{Migrator, MIGRATIONS};
use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tally_core::error::{Result, StoreError};
use tally_core::{LogEntry, NewLogEntry, Page, StatsStore, Store};
use tracing::{info, trace};

/// SQLite implementation of the store contract.
///
/// The counter lives in the singleton `redirects_count` row (`id = 1`) and
/// every redirect appends one row to `request_logs`. Timestamps are stored
/// as unix milliseconds so range counts compare plain integers.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a store from an existing SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new SQLite connection pool.
    ///
    /// The database file is created when missing. Schema migrations are not
    /// applied here; call [`Store::initialize`].
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        // A single long-lived connection serializes writes and keeps
        // `sqlite::memory:` databases alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool. Every later operation fails with `Unavailable`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn seed_missing() -> StoreError {
    StoreError::RecordMissing("redirects_count row with id 1".to_string())
}

fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative count {value}")))
}

fn parse_timestamp(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StoreError::InvalidData(format!("invalid log timestamp '{}': {e}", millis))
    })
}

fn decode_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LogEntry> {
    let timestamp: i64 = row.try_get("timestamp").map_err(map_sqlx_error)?;
    let status_code: i64 = row.try_get("status_code").map_err(map_sqlx_error)?;

    Ok(LogEntry {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        timestamp: parse_timestamp(timestamp)?,
        remote_addr: row.try_get("remote_addr").map_err(map_sqlx_error)?,
        method: row.try_get("request_method").map_err(map_sqlx_error)?,
        request_uri: row.try_get("request_uri").map_err(map_sqlx_error)?,
        protocol: row.try_get("protocol").map_err(map_sqlx_error)?,
        status_code: u16::try_from(status_code).map_err(|_| {
            StoreError::InvalidData(format!("invalid status code {status_code}"))
        })?,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
        referer: row.try_get("referer").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl StatsStore for SqliteStore {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn read_counter(&self) -> Result<u64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM redirects_count WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        to_count(count.ok_or_else(seed_missing)?)
    }

    async fn count_log_entries(&self, from: Timestamp, to: Timestamp) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM request_logs
            WHERE timestamp BETWEEN ? AND ?
            "#,
        )
        .bind(from.as_millisecond())
        .bind(to.as_millisecond())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        to_count(count)
    }

    async fn count_all_log_entries(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        to_count(count)
    }

    async fn list_log_entries(&self, page: Page) -> Result<Vec<LogEntry>> {
        let offset = i64::try_from(page.offset())
            .map_err(|_| StoreError::InvalidArgument("page offset overflows".to_string()))?;

        let rows = sqlx::query(
            r#"
            SELECT
                id,
                timestamp,
                remote_addr,
                request_method,
                request_uri,
                protocol,
                status_code,
                user_agent,
                referer
            FROM request_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(page.size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(decode_entry).collect()
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn initialize(&self) -> Result<()> {
        let applied = Migrator::new(MIGRATIONS).run(&self.pool).await?;
        info!(applied = ?applied, "schema is current");
        Ok(())
    }

    async fn increment_counter(&self) -> Result<()> {
        let result = sqlx::query("UPDATE redirects_count SET count = count + 1 WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(seed_missing());
        }

        trace!("incremented durable redirect counter");
        Ok(())
    }

    async fn append_log_entry(&self, entry: NewLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO request_logs (
                timestamp,
                remote_addr,
                request_method,
                request_uri,
                protocol,
                status_code,
                user_agent,
                referer
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.timestamp.as_millisecond())
        .bind(entry.remote_addr)
        .bind(entry.method)
        .bind(entry.request_uri)
        .bind(entry.protocol)
        .bind(i64::from(entry.status_code))
        .bind(entry.user_agent)
        .bind(entry.referer)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
