use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use snip_core::error::{Result, StorageError};
use snip_core::repository::{newest_first, ReadRepository, Repository, UrlRecord};
use snip_core::shortcode::ShortCode;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// One value of the JSON document, keyed by short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct FileEntry {
    original_url: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    created_at: Timestamp,
    clicks: u64,
}

/// Reads an RFC 3339 timestamp, or a datetime without offset taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(timestamp) = raw.parse::<Timestamp>() {
        return Ok(timestamp);
    }

    raw.parse::<jiff::civil::DateTime>()
        .and_then(|datetime| datetime.to_zoned(jiff::tz::TimeZone::UTC))
        .map(|zoned| zoned.timestamp())
        .map_err(serde::de::Error::custom)
}

/// The loaded document plus its URL index.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    records: BTreeMap<String, FileEntry>,
    by_url: HashMap<String, String>,
}

impl Snapshot {
    fn from_records(records: BTreeMap<String, FileEntry>) -> Self {
        let mut by_url = HashMap::with_capacity(records.len());
        for (code, entry) in &records {
            if let Some(first) = by_url.insert(entry.original_url.clone(), code.clone()) {
                warn!(
                    url = %entry.original_url,
                    kept = %first,
                    ignored = %code,
                    "url stored under several codes, indexing the first one"
                );
                by_url.insert(entry.original_url.clone(), first);
            }
        }
        Self { records, by_url }
    }

    fn record(&self, code: &str) -> Option<UrlRecord> {
        self.records.get(code).map(|entry| UrlRecord {
            short_code: ShortCode::new_unchecked(code),
            original_url: entry.original_url.clone(),
            created_at: entry.created_at,
            clicks: entry.clicks,
        })
    }

    fn insert(&mut self, record: UrlRecord) -> Result<()> {
        if self.by_url.contains_key(&record.original_url) {
            return Err(StorageError::UrlConflict(record.original_url));
        }
        if self.records.contains_key(record.short_code.as_str()) {
            return Err(StorageError::CodeConflict(record.short_code.to_string()));
        }

        let code = record.short_code.as_str().to_owned();
        self.by_url
            .insert(record.original_url.clone(), code.clone());
        self.records.insert(
            code,
            FileEntry {
                original_url: record.original_url,
                created_at: record.created_at,
                clicks: record.clicks,
            },
        );
        Ok(())
    }

    fn remove(&mut self, code: &str) -> bool {
        let Some(entry) = self.records.remove(code) else {
            return false;
        };
        if self.by_url.get(&entry.original_url).map(String::as_str) == Some(code) {
            self.by_url.remove(&entry.original_url);
        }
        true
    }
}

/// Outcome of a closure run under the write lock.
enum Mutation<T> {
    /// Nothing changed, the file is left alone.
    Unchanged(T),
    /// The snapshot changed and must be saved before the value is returned.
    Changed(T),
}

/// Repository backed by a single JSON document on disk.
///
/// The whole document is held in memory behind a `RwLock` which acts as the
/// process-wide write lock: reads share it, every load-mutate-save cycle
/// holds it exclusively. A mutation is applied to a copy, the copy is
/// written to a sibling temp file and renamed over the document, and only
/// then does it replace the in-memory state. Saves run on their own task so
/// a caller that gives up mid-write cannot leave memory and disk apart.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: Arc<PathBuf>,
    state: Arc<RwLock<Snapshot>>,
}

impl JsonFileRepository {
    /// Opens the document at `path`. A missing file is an empty store; the
    /// file is created by the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::InvalidData(format!(
                    "failed to parse url file '{}': {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "url file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(map_io_error(&path, e)),
        };

        info!(path = %path.display(), records = records.len(), "loaded url file");

        Ok(Self {
            path: Arc::new(path),
            state: Arc::new(RwLock::new(Snapshot::from_records(records))),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Snapshot) -> Result<Mutation<T>> + Send + 'static,
    {
        let task = tokio::spawn(apply(
            Arc::clone(&self.state),
            Arc::clone(&self.path),
            f,
        ));

        task.await
            .map_err(|e| StorageError::Operation(format!("url file write task failed: {e}")))?
    }
}

async fn apply<T, F>(state: Arc<RwLock<Snapshot>>, path: Arc<PathBuf>, f: F) -> Result<T>
where
    F: FnOnce(&mut Snapshot) -> Result<Mutation<T>>,
{
    let mut guard = state.write_owned().await;
    let mut next = guard.clone();

    match f(&mut next)? {
        Mutation::Unchanged(value) => Ok(value),
        Mutation::Changed(value) => {
            persist(&path, &next).await?;
            *guard = next;
            Ok(value)
        }
    }
}

/// Writes the snapshot next to `path` and atomically renames it into place.
async fn persist(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(&snapshot.records)
        .map_err(|e| StorageError::InvalidData(format!("failed to encode url file: {e}")))?;

    let tmp = temp_path(path);
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| map_io_error(&tmp, e))?;
    file.write_all(&json)
        .await
        .map_err(|e| map_io_error(&tmp, e))?;
    file.sync_all().await.map_err(|e| map_io_error(&tmp, e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| map_io_error(path, e))?;

    debug!(path = %path.display(), records = snapshot.records.len(), "saved url file");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn map_io_error(path: &Path, err: std::io::Error) -> StorageError {
    let message = format!("{}: {err}", path.display());
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::Interrupted => StorageError::Busy(message),
        ErrorKind::TimedOut => StorageError::Timeout(message),
        _ => StorageError::Io(message),
    }
}

#[async_trait]
impl ReadRepository for JsonFileRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.state.read().await.record(code.as_str()))
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.state.read().await.records.contains_key(code.as_str()))
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let state = self.state.read().await;
        Ok(state
            .by_url
            .get(original_url)
            .and_then(|code| state.record(code)))
    }

    async fn list_all(&self) -> Result<Vec<UrlRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<UrlRecord> = state
            .records
            .keys()
            .filter_map(|code| state.record(code))
            .collect();
        records.sort_by(newest_first);
        Ok(records)
    }
}

#[async_trait]
impl Repository for JsonFileRepository {
    async fn put(&self, record: UrlRecord) -> Result<()> {
        self.mutate(move |snapshot| {
            snapshot.insert(record)?;
            Ok(Mutation::Changed(()))
        })
        .await
    }

    async fn put_many(&self, records: Vec<UrlRecord>) -> Result<Vec<Result<()>>> {
        self.mutate(move |snapshot| {
            let outcomes: Vec<Result<()>> = records
                .into_iter()
                .map(|record| snapshot.insert(record))
                .collect();

            if outcomes.iter().any(|outcome| outcome.is_ok()) {
                Ok(Mutation::Changed(outcomes))
            } else {
                Ok(Mutation::Unchanged(outcomes))
            }
        })
        .await
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let code = code.as_str().to_owned();
        self.mutate(move |snapshot| {
            let Some(entry) = snapshot.records.get_mut(&code) else {
                return Ok(Mutation::Unchanged(None));
            };
            entry.clicks = entry.clicks.saturating_add(1);
            Ok(Mutation::Changed(snapshot.record(&code)))
        })
        .await
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let code = code.as_str().to_owned();
        self.mutate(move |snapshot| {
            if snapshot.remove(&code) {
                Ok(Mutation::Changed(true))
            } else {
                Ok(Mutation::Unchanged(false))
            }
        })
        .await
    }
}
