use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::error::{Result, StorageError};
use snip_core::repository::{ReadRepository, Repository, UrlRecord};
use snip_core::shortcode::ShortCode;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../ddl/sqlite/short_urls.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of the repository contract.
///
/// `short_code` is the primary key and `original_url` carries a unique
/// index, so both uniqueness invariants are enforced by the database at
/// insert time. `created_at` is stored as microseconds since the Unix epoch.
/// Deletes are hard deletes: a removed code may be generated again.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a repository from an existing pool. The schema is not applied;
    /// call [`SqliteRepository::migrate`] when the pool is fresh.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url` and applies
    /// the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(map_sqlx_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let repository = Self::new(pool);
        repository.migrate().await?;
        info!(database_url, "connected to sqlite");
        Ok(repository)
    }

    /// Opens a private in-memory database on a single long-lived connection.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(map_sqlx_error)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let repository = Self::new(pool);
        repository.migrate().await?;
        Ok(repository)
    }

    /// Creates the table and its indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn insert_record<'e, E>(executor: E, record: &UrlRecord) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO short_urls (short_code, original_url, created_at, clicks)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(record.short_code.to_string())
    .bind(record.original_url.clone())
    .bind(record.created_at.as_microsecond())
    .bind(clicks_to_db(record.clicks)?)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(conflict_for(&err, record)),
        Err(err) => Err(map_sqlx_error(err)),
    }
}

fn record_from_row(row: &SqliteRow) -> Result<UrlRecord> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let created_at_raw: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let clicks_raw: i64 = row.try_get("clicks").map_err(map_sqlx_error)?;

    let created_at = Timestamp::from_microsecond(created_at_raw).map_err(|e| {
        StorageError::InvalidData(format!(
            "invalid created_at timestamp '{}': {e}",
            created_at_raw
        ))
    })?;
    let clicks = u64::try_from(clicks_raw).map_err(|_| {
        StorageError::InvalidData(format!("negative click count {} for '{}'", clicks_raw, short_code))
    })?;

    Ok(UrlRecord {
        short_code: ShortCode::new_unchecked(short_code),
        original_url,
        created_at,
        clicks,
    })
}

fn clicks_to_db(clicks: u64) -> Result<i64> {
    i64::try_from(clicks)
        .map_err(|_| StorageError::InvalidData(format!("click count {} does not fit", clicks)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Tells which unique constraint an insert tripped over.
fn conflict_for(err: &sqlx::Error, record: &UrlRecord) -> StorageError {
    let on_url = err
        .as_database_error()
        .is_some_and(|db| db.message().contains("original_url"));

    if on_url {
        StorageError::UrlConflict(record.original_url.clone())
    } else {
        StorageError::CodeConflict(record.short_code.to_string())
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes.
fn is_busy(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    if is_busy(&err) {
        return StorageError::Busy(message);
    }

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        sqlx::Error::Configuration(_) => StorageError::Operation(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for SqliteRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, original_url, created_at, clicks
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM short_urls WHERE short_code = ? LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, original_url, created_at, clicks
            FROM short_urls
            WHERE original_url = ?
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<UrlRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url, created_at, clicks
            FROM short_urls
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn put(&self, record: UrlRecord) -> Result<()> {
        insert_record(&self.pool, &record).await
    }

    async fn put_many(&self, records: Vec<UrlRecord>) -> Result<Vec<Result<()>>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // A constraint violation only rolls back its own statement, so the
        // batch goes on. Any other failure may have ended the transaction;
        // dropping `tx` rolls back whatever is left.
        let mut outcomes = Vec::with_capacity(records.len());
        for record in &records {
            match insert_record(&mut *tx, record).await {
                Ok(()) => outcomes.push(Ok(())),
                Err(err @ (StorageError::CodeConflict(_) | StorageError::UrlConflict(_))) => {
                    outcomes.push(Err(err))
                }
                Err(err) => return Err(err),
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(
            stored = outcomes.iter().filter(|o| o.is_ok()).count(),
            total = outcomes.len(),
            "committed batch insert"
        );
        Ok(outcomes)
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            UPDATE short_urls
            SET clicks = clicks + 1
            WHERE short_code = ?
            RETURNING short_code, original_url, created_at, clicks
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let result = sqlx::query("DELETE FROM short_urls WHERE short_code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
