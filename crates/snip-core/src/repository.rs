use crate::error::Result;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored URL record in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The code the record is addressed by.
    pub short_code: ShortCode,
    /// The normalized URL that was shortened.
    pub original_url: String,
    /// When the record was created.
    pub created_at: Timestamp,
    /// How many times the code has been resolved.
    pub clicks: u64,
}

impl UrlRecord {
    /// Creates a fresh record with no clicks.
    pub fn new(short_code: ShortCode, original_url: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            created_at,
            clicks: 0,
        }
    }
}

/// Orders records newest first.
///
/// Records created within the same instant fall back to the short code so
/// backends without an insertion order still list deterministically.
pub fn newest_first(a: &UrlRecord, b: &UrlRecord) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.short_code.cmp(&b.short_code))
}

/// A read-only view of a repository.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Checks whether a short code is currently taken.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Looks up the record holding the given normalized URL through the
    /// backend's secondary index.
    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>>;

    /// Returns every live record, newest first.
    async fn list_all(&self) -> Result<Vec<UrlRecord>>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record.
    ///
    /// Uniqueness is enforced at insert time: returns
    /// `Err(CodeConflict)` if the short code is taken and
    /// `Err(UrlConflict)` if another record already holds the URL.
    /// `Ok` means the record is durably stored.
    async fn put(&self, record: UrlRecord) -> Result<()>;

    /// Inserts several records at once, reporting one outcome per record in
    /// input order. A failing record never prevents the others from being
    /// stored.
    async fn put_many(&self, records: Vec<UrlRecord>) -> Result<Vec<Result<()>>> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.put(record).await);
        }
        Ok(outcomes)
    }

    /// Atomically adds one click to the record and returns it as updated.
    /// Returns `None` if the code does not exist.
    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Deletes the record for a given short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;
}
