use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// Largest batch accepted by [`Shortener::bulk_shorten`].
pub const MAX_BULK_ITEMS: usize = 100;

/// The record a shorten call ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenOutcome {
    pub record: UrlRecord,
    /// `false` when the URL had already been shortened before.
    pub created: bool,
}

/// One input of a bulk shorten call.
///
/// Transports classify their raw input before calling the store; anything
/// that is not a string becomes [`BulkItem::NotString`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkItem {
    Url(String),
    NotString,
}

impl From<&str> for BulkItem {
    fn from(value: &str) -> Self {
        BulkItem::Url(value.to_owned())
    }
}

impl From<String> for BulkItem {
    fn from(value: String) -> Self {
        BulkItem::Url(value)
    }
}

/// Result of one bulk item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    Shortened(ShortenOutcome),
    Failed { reason: String },
}

/// Aggregate result of a bulk shorten call, outcomes in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub outcomes: Vec<BulkOutcome>,
}

impl BulkReport {
    pub fn total_processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn new_urls(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BulkOutcome::Shortened(s) if s.created))
            .count()
    }

    pub fn existing_urls(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BulkOutcome::Shortened(s) if !s.created))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BulkOutcome::Failed { .. }))
            .count()
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens a URL, or returns the existing record if its normalized form
    /// was shortened before.
    async fn shorten(&self, url: &str) -> Result<ShortenOutcome>;

    /// Shortens up to [`MAX_BULK_ITEMS`] URLs, isolating per-item failures.
    async fn bulk_shorten(&self, items: Vec<BulkItem>) -> Result<BulkReport>;

    /// Resolves a short code to its original URL, counting one click.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;

    /// Returns the stored record without counting a click.
    async fn stats(&self, code: &ShortCode) -> Result<UrlRecord>;

    /// Lists every record, newest first.
    async fn list(&self) -> Result<Vec<UrlRecord>>;

    /// Deletes a shortened URL by its short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;
}
