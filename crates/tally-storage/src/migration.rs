//! Ordered, append-only schema migrations.
//!
//! Each migration is applied at most once and its version is recorded in
//! `schema_migrations` inside the same transaction as its statements, so a
//! failed migration leaves neither its schema change nor its marker behind.
//! Never edit a released migration; append a new one instead.

use crate::sqlite::map_sqlx_error;
use sqlx::SqlitePool;
use tally_core::error::{Result, StoreError};
use tracing::{debug, info};

/// A single schema migration.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// The schema history of the redirect counter store.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create redirects table with seed row",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS redirects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                count INTEGER NOT NULL DEFAULT 0
            )
            "#,
            "INSERT OR IGNORE INTO redirects (id, count) VALUES (1, 0)",
        ],
    },
    Migration {
        version: 2,
        description: "rename redirects to redirects_count",
        statements: &["ALTER TABLE redirects RENAME TO redirects_count"],
    },
    Migration {
        version: 3,
        description: "create request_logs table",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                remote_addr TEXT NOT NULL DEFAULT '',
                request_method TEXT NOT NULL DEFAULT '',
                request_uri TEXT NOT NULL DEFAULT '',
                protocol TEXT NOT NULL DEFAULT '',
                status_code INTEGER NOT NULL,
                user_agent TEXT NOT NULL DEFAULT '',
                referer TEXT NOT NULL DEFAULT ''
            )
            "#],
    },
    Migration {
        version: 4,
        description: "index request_logs by timestamp",
        statements: &[
            "CREATE INDEX IF NOT EXISTS idx_request_logs_timestamp ON request_logs (timestamp)",
        ],
    },
];

const CREATE_MARKER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// Applies a sequence of migrations in ascending version order.
#[derive(Debug, Clone, Copy)]
pub struct Migrator<'a> {
    migrations: &'a [Migration],
}

impl<'a> Migrator<'a> {
    pub fn new(migrations: &'a [Migration]) -> Self {
        Self { migrations }
    }

    /// Applies every pending migration and returns the versions applied by
    /// this run. Returns an empty list when the schema is already current.
    pub async fn run(&self, pool: &SqlitePool) -> Result<Vec<u32>> {
        sqlx::query(CREATE_MARKER_TABLE)
            .execute(pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut ordered: Vec<&Migration> = self.migrations.iter().collect();
        ordered.sort_by_key(|migration| migration.version);

        let mut applied = Vec::new();
        for migration in ordered {
            if self.apply(pool, migration).await? {
                applied.push(migration.version);
            }
        }

        Ok(applied)
    }

    /// Returns `Ok(false)` when the migration had already been applied.
    async fn apply(&self, pool: &SqlitePool, migration: &Migration) -> Result<bool> {
        let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

        let recorded = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM schema_migrations WHERE version = ?",
        )
        .bind(i64::from(migration.version))
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        if recorded {
            tx.rollback().await.map_err(map_sqlx_error)?;
            debug!(version = migration.version, "migration already applied");
            return Ok(false);
        }

        for statement in migration.statements.iter().copied() {
            if let Err(err) = sqlx::query(statement).execute(&mut *tx).await {
                tx.rollback().await.map_err(map_sqlx_error)?;
                return Err(failed(migration, err));
            }
        }

        if let Err(err) = sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
            .bind(i64::from(migration.version))
            .execute(&mut *tx)
            .await
        {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(failed(migration, err));
        }

        tx.commit().await.map_err(|err| failed(migration, err))?;

        info!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
        Ok(true)
    }
}

fn failed(migration: &Migration, err: sqlx::Error) -> StoreError {
    StoreError::MigrationFailed {
        version: migration.version,
        reason: err.to_string(),
    }
}

/// Returns the recorded migration versions in ascending order.
pub async fn applied_versions(pool: &SqlitePool) -> Result<Vec<u32>> {
    let versions: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM schema_migrations ORDER BY version")
            .fetch_all(pool)
            .await
            .map_err(map_sqlx_error)?;

    versions
        .into_iter()
        .map(|version| {
            u32::try_from(version).map_err(|_| {
                StoreError::InvalidData(format!("invalid migration version {version}"))
            })
        })
        .collect()
}
