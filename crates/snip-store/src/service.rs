use crate::settings::StoreSettings;
use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::{
    normalize_url, BulkItem, BulkOutcome, BulkReport, Repository, ShortCode, ShortenOutcome,
    Shortener, ShortenerError, StorageError, UrlRecord, MAX_BULK_ITEMS,
};
use snip_generator::Generator;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

const NOT_A_STRING: &str = "URL must be a string";
const EMPTY_URL: &str = "URL cannot be empty";

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - URL normalization and deduplication by original URL
/// - Short code generation with a bounded resample-on-collision loop
/// - Click counting on resolution
///
/// Uniqueness of both the code and the URL is left to the repository's
/// insert, so concurrent callers racing on the same URL end up sharing the
/// winner's record.
#[derive(Debug, Clone)]
pub struct UrlStore<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    settings: StoreSettings,
}

impl<R: Repository, G: Generator> UrlStore<R, G> {
    /// Creates a new `UrlStore` with default settings.
    pub fn new(repository: R, generator: G) -> Self {
        Self::with_settings(repository, generator, StoreSettings::default())
    }

    pub fn with_settings(repository: R, generator: G, settings: StoreSettings) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            settings,
        }
    }

    /// The backend this store writes to.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn validate_url(url: &str) -> Result<(), ShortenerError> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidArgument(EMPTY_URL.to_string()));
        }
        Ok(())
    }

    fn generate_code(&self) -> ShortCode {
        self.generator.generate().into()
    }

    fn max_attempts(&self) -> u32 {
        self.settings.max_code_attempts.max(1)
    }

    /// Creates a record for a URL that was not found, or returns the record a
    /// concurrent caller created first.
    async fn create_or_fetch(&self, original_url: &str) -> Result<ShortenOutcome, ShortenerError> {
        let attempts = self.max_attempts();

        for attempt in 1..=attempts {
            let record = UrlRecord::new(self.generate_code(), original_url, now());

            match self.repository.put(record.clone()).await {
                Ok(()) => {
                    debug!(code = %record.short_code, url = %record.original_url, "created short code");
                    return Ok(ShortenOutcome {
                        record,
                        created: true,
                    });
                }
                Err(StorageError::CodeConflict(code)) => {
                    warn!(code = %code, attempt, "generated short code already taken, resampling");
                }
                Err(StorageError::UrlConflict(_)) => {
                    if let Some(existing) = self.repository.find_by_original_url(original_url).await? {
                        debug!(code = %existing.short_code, url = %original_url, "url shortened concurrently");
                        return Ok(ShortenOutcome {
                            record: existing,
                            created: false,
                        });
                    }
                    // The winner was deleted in between; try again.
                    trace!(url = %original_url, attempt, "conflicting record vanished");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(url = %original_url, attempts, "no free short code found");
        Err(ShortenerError::Exhausted { attempts })
    }

    /// Draws a code not used by an earlier item of the same batch.
    fn generate_batch_code(&self, taken: &HashSet<ShortCode>) -> Option<ShortCode> {
        (0..self.max_attempts())
            .map(|_| self.generate_code())
            .find(|code| !taken.contains(code))
    }

    /// Turns the repository's verdict on one pending record into the item's
    /// outcome, falling back to the single-item path on conflicts.
    async fn settle(
        &self,
        record: UrlRecord,
        stored: Result<(), StorageError>,
    ) -> BulkOutcome {
        let fallback = match stored {
            Ok(()) => {
                return BulkOutcome::Shortened(ShortenOutcome {
                    record,
                    created: true,
                })
            }
            Err(StorageError::CodeConflict(_)) | Err(StorageError::UrlConflict(_)) => {
                self.create_or_fetch(&record.original_url).await
            }
            Err(e) => Err(e.into()),
        };

        match fallback {
            Ok(outcome) => BulkOutcome::Shortened(outcome),
            Err(e) => BulkOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Creation time with the microsecond precision every backend can store.
fn now() -> Timestamp {
    let now = Timestamp::now();
    Timestamp::from_microsecond(now.as_microsecond()).unwrap_or(now)
}

/// Where the outcome of one bulk item comes from.
enum Slot {
    Done(BulkOutcome),
    /// Index into the batch's pending records.
    Pending(usize),
    /// Same normalized URL as a pending record earlier in the batch.
    SameAs(usize),
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for UrlStore<R, G> {
    async fn shorten(&self, url: &str) -> Result<ShortenOutcome, ShortenerError> {
        Self::validate_url(url)?;
        let original_url = normalize_url(url);

        if let Some(record) = self.repository.find_by_original_url(&original_url).await? {
            trace!(code = %record.short_code, url = %original_url, "url already shortened");
            return Ok(ShortenOutcome {
                record,
                created: false,
            });
        }

        self.create_or_fetch(&original_url).await
    }

    async fn bulk_shorten(&self, items: Vec<BulkItem>) -> Result<BulkReport, ShortenerError> {
        if items.is_empty() {
            return Err(ShortenerError::InvalidArgument(
                "URLs list cannot be empty".to_string(),
            ));
        }
        if items.len() > MAX_BULK_ITEMS {
            return Err(ShortenerError::InvalidArgument(format!(
                "Maximum {} URLs allowed per request",
                MAX_BULK_ITEMS
            )));
        }

        let mut slots = Vec::with_capacity(items.len());
        let mut pending: Vec<UrlRecord> = Vec::new();
        let mut pending_by_url: HashMap<String, usize> = HashMap::new();
        let mut batch_codes: HashSet<ShortCode> = HashSet::new();

        for item in items {
            let url = match item {
                BulkItem::Url(url) if !url.trim().is_empty() => url,
                BulkItem::Url(_) => {
                    slots.push(Slot::Done(failed(EMPTY_URL)));
                    continue;
                }
                BulkItem::NotString => {
                    slots.push(Slot::Done(failed(NOT_A_STRING)));
                    continue;
                }
            };

            let original_url = normalize_url(&url);
            if let Some(&index) = pending_by_url.get(&original_url) {
                slots.push(Slot::SameAs(index));
                continue;
            }

            let slot = match self.repository.find_by_original_url(&original_url).await {
                Ok(Some(record)) => Slot::Done(BulkOutcome::Shortened(ShortenOutcome {
                    record,
                    created: false,
                })),
                Ok(None) => match self.generate_batch_code(&batch_codes) {
                    Some(code) => {
                        batch_codes.insert(code.clone());
                        pending.push(UrlRecord::new(code, original_url.clone(), now()));
                        pending_by_url.insert(original_url, pending.len() - 1);
                        Slot::Pending(pending.len() - 1)
                    }
                    None => Slot::Done(failed(
                        &ShortenerError::Exhausted {
                            attempts: self.max_attempts(),
                        }
                        .to_string(),
                    )),
                },
                Err(e) => Slot::Done(failed(&ShortenerError::from(e).to_string())),
            };
            slots.push(slot);
        }

        // All new records of the batch go to the backend in one write.
        let stored: Vec<Result<(), StorageError>> = if pending.is_empty() {
            Vec::new()
        } else {
            match self.repository.put_many(pending.clone()).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(error = %e, records = pending.len(), "batch write failed");
                    pending.iter().map(|_| Err(e.clone())).collect()
                }
            }
        };

        let mut settled = Vec::with_capacity(pending.len());
        for (record, outcome) in pending.into_iter().zip(stored) {
            settled.push(self.settle(record, outcome).await);
        }

        let outcomes: Vec<BulkOutcome> = slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Done(outcome) => outcome,
                Slot::Pending(index) => settled[index].clone(),
                Slot::SameAs(index) => match &settled[index] {
                    BulkOutcome::Shortened(first) => BulkOutcome::Shortened(ShortenOutcome {
                        record: first.record.clone(),
                        created: false,
                    }),
                    failure => failure.clone(),
                },
            })
            .collect();

        let report = BulkReport { outcomes };
        info!(
            total = report.total_processed(),
            new = report.new_urls(),
            existing = report.existing_urls(),
            errors = report.errors(),
            "bulk shorten finished"
        );
        Ok(report)
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String, ShortenerError> {
        trace!(code = %code, "resolving short code");

        match self.repository.increment_clicks(code).await? {
            Some(record) => {
                debug!(code = %code, url = %record.original_url, clicks = record.clicks, "resolved short code");
                Ok(record.original_url)
            }
            None => {
                trace!(code = %code, "short code not found");
                Err(ShortenerError::NotFound(code.to_string()))
            }
        }
    }

    async fn stats(&self, code: &ShortCode) -> Result<UrlRecord, ShortenerError> {
        self.repository
            .get(code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))
    }

    async fn list(&self) -> Result<Vec<UrlRecord>, ShortenerError> {
        Ok(self.repository.list_all().await?)
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool, ShortenerError> {
        let deleted = self.repository.delete(code).await?;
        if deleted {
            info!(code = %code, "deleted short code");
        }
        Ok(deleted)
    }
}

fn failed(reason: &str) -> BulkOutcome {
    BulkOutcome::Failed {
        reason: reason.to_string(),
    }
}
