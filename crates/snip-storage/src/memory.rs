use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use snip_core::error::{Result, StorageError};
use snip_core::repository::{ReadRepository, Repository, UrlRecord};
use snip_core::shortcode::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory storage entry for a URL mapping.
#[derive(Debug, Clone)]
struct StoredUrl {
    original_url: String,
    created_at: Timestamp,
    clicks: u64,
    /// Insertion order, used to break `created_at` ties when listing.
    seq: u64,
}

impl StoredUrl {
    fn to_record(&self, code: &str) -> UrlRecord {
        UrlRecord {
            short_code: ShortCode::new_unchecked(code),
            original_url: self.original_url.clone(),
            created_at: self.created_at,
            clicks: self.clicks,
        }
    }
}

/// In-memory implementation of the Repository trait using DashMap.
///
/// Records are keyed by short code; a second map indexes them by original
/// URL. Whenever both maps are locked at once the URL index is locked
/// first, which keeps inserts and deletes free of lock-order inversions.
#[derive(Debug)]
pub struct InMemoryRepository {
    records: DashMap<String, StoredUrl>,
    by_url: DashMap<String, String>,
    next_seq: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            by_url: DashMap::with_capacity(capacity),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self
            .records
            .get(code.as_str())
            .map(|entry| entry.to_record(entry.key())))
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.records.contains_key(code.as_str()))
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        // Release the index guard before touching the record map.
        let Some(code) = self.by_url.get(original_url).map(|code| code.value().clone()) else {
            return Ok(None);
        };

        Ok(self
            .records
            .get(&code)
            .map(|entry| entry.to_record(entry.key())))
    }

    async fn list_all(&self) -> Result<Vec<UrlRecord>> {
        let mut entries: Vec<(u64, UrlRecord)> = self
            .records
            .iter()
            .map(|entry| (entry.seq, entry.to_record(entry.key())))
            .collect();

        entries.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_seq.cmp(a_seq))
        });

        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn put(&self, record: UrlRecord) -> Result<()> {
        let UrlRecord {
            short_code,
            original_url,
            created_at,
            clicks,
        } = record;

        let url_slot = match self.by_url.entry(original_url) {
            Entry::Occupied(slot) => return Err(StorageError::UrlConflict(slot.key().clone())),
            Entry::Vacant(slot) => slot,
        };

        match self.records.entry(short_code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::CodeConflict(short_code.to_string())),
            Entry::Vacant(code_slot) => {
                code_slot.insert(StoredUrl {
                    original_url: url_slot.key().clone(),
                    created_at,
                    clicks,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                });
                url_slot.insert(short_code.as_str().to_owned());
                Ok(())
            }
        }
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let Some(mut entry) = self.records.get_mut(code.as_str()) else {
            return Ok(None);
        };

        entry.clicks = entry.clicks.saturating_add(1);
        Ok(Some(entry.to_record(code.as_str())))
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        let Some(original_url) = self
            .records
            .get(code.as_str())
            .map(|entry| entry.original_url.clone())
        else {
            return Ok(false);
        };

        let removed = match self.by_url.entry(original_url) {
            Entry::Occupied(slot) => {
                let removed = self.records.remove(code.as_str()).is_some();
                if slot.get() == code.as_str() {
                    slot.remove();
                }
                removed
            }
            Entry::Vacant(_) => self.records.remove(code.as_str()).is_some(),
        };

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn record(c: &str, url: &str) -> UrlRecord {
        UrlRecord::new(code(c), url, Timestamp::now())
    }

    #[tokio::test]
    async fn put_and_get() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();

        let result = repo.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(result.original_url, "https://example.com");
        assert_eq!(result.clicks, 0);
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let repo = InMemoryRepository::new();

        let result = repo.get(&code("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn put_code_conflict() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();

        let err = repo
            .put(record("abc123", "https://other.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::CodeConflict(_)));
        // The losing URL must not linger in the index.
        assert!(repo
            .find_by_original_url("https://other.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn put_url_conflict() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();

        let err = repo
            .put(record("xyz789", "https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UrlConflict(_)));
        assert!(!repo.exists(&code("xyz789")).await.unwrap());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn find_by_original_url() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();

        let found = repo
            .find_by_original_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.short_code, code("abc123"));

        assert!(repo
            .find_by_original_url("https://missing.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_all_newest_first() {
        let repo = InMemoryRepository::new();
        let base = Timestamp::now();

        repo.put(UrlRecord::new(code("old"), "https://old.com", base))
            .await
            .unwrap();
        repo.put(UrlRecord::new(
            code("new"),
            "https://new.com",
            base + SignedDuration::from_secs(10),
        ))
        .await
        .unwrap();
        repo.put(UrlRecord::new(
            code("mid"),
            "https://mid.com",
            base + SignedDuration::from_secs(5),
        ))
        .await
        .unwrap();

        let codes: Vec<_> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.short_code.to_string())
            .collect();
        assert_eq!(codes, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn list_all_breaks_ties_by_insertion_order() {
        let repo = InMemoryRepository::new();
        let at = Timestamp::now();

        repo.put(UrlRecord::new(code("first"), "https://a.com", at))
            .await
            .unwrap();
        repo.put(UrlRecord::new(code("second"), "https://b.com", at))
            .await
            .unwrap();

        let codes: Vec<_> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.short_code.to_string())
            .collect();
        assert_eq!(codes, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn increment_clicks() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();

        let first = repo.increment_clicks(&code("abc123")).await.unwrap().unwrap();
        let second = repo.increment_clicks(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(first.clicks, 1);
        assert_eq!(second.clicks, 2);

        assert!(repo.increment_clicks(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_existing() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();

        assert!(repo.delete(&code("abc123")).await.unwrap());
        assert!(repo.get(&code("abc123")).await.unwrap().is_none());
        assert!(repo
            .find_by_original_url("https://example.com")
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete(&code("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_url_can_be_shortened_again() {
        let repo = InMemoryRepository::new();

        repo.put(record("abc123", "https://example.com"))
            .await
            .unwrap();
        repo.delete(&code("abc123")).await.unwrap();

        repo.put(record("xyz789", "https://example.com"))
            .await
            .unwrap();
        let found = repo
            .find_by_original_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.short_code, code("xyz789"));
    }

    #[tokio::test]
    async fn put_many_reports_each_outcome() {
        let repo = InMemoryRepository::new();

        repo.put(record("taken", "https://taken.com")).await.unwrap();

        let outcomes = repo
            .put_many(vec![
                record("a1", "https://a.com"),
                record("taken", "https://b.com"),
                record("c1", "https://taken.com"),
                record("d1", "https://d.com"),
            ])
            .await
            .unwrap();

        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(StorageError::CodeConflict(_))));
        assert!(matches!(outcomes[2], Err(StorageError::UrlConflict(_))));
        assert!(outcomes[3].is_ok());
        assert_eq!(repo.len(), 3);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.put(record("hot", "https://hot.com")).await.unwrap();

        let mut handles = vec![];
        for _ in 0..50 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.increment_clicks(&code("hot")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.get(&code("hot")).await.unwrap().unwrap().clicks, 50);
    }

    #[tokio::test]
    async fn concurrent_puts_of_one_url_keep_a_single_record() {
        let repo = Arc::new(InMemoryRepository::new());

        let mut handles = vec![];
        for i in 0..20u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.put(record(&format!("code{i:03}"), "https://same.com"))
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(repo.len(), 1);
    }
}
