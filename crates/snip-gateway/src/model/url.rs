use crate::error::AppError;
use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;
use snip_store::{BulkItem, BulkOutcome, BulkReport, ShortenOutcome, UrlRecord};

/// Body of `POST /api/shorten`.
///
/// Parsed from a loose JSON value so that a missing field and a field of the
/// wrong type get their own messages.
#[derive(Debug, PartialEq, Eq)]
pub struct ShortenRequest {
    pub url: String,
}

impl ShortenRequest {
    pub fn from_body(body: Option<Value>) -> Result<Self, AppError> {
        match body.as_ref().and_then(|body| body.get("url")) {
            None => Err(AppError::bad_request("URL is required")),
            Some(Value::String(url)) => Ok(Self { url: url.clone() }),
            Some(_) => Err(AppError::bad_request("URL must be a string")),
        }
    }
}

/// Body of `POST /api/bulk-shorten`. Items keep their raw JSON value so
/// failures can echo them back.
#[derive(Debug, PartialEq, Eq)]
pub struct BulkShortenRequest {
    pub urls: Vec<Value>,
}

impl BulkShortenRequest {
    pub fn from_body(body: Option<Value>) -> Result<Self, AppError> {
        match body.and_then(|mut body| body.get_mut("urls").map(Value::take)) {
            None => Err(AppError::bad_request("URLs list is required")),
            Some(Value::Array(urls)) => Ok(Self { urls }),
            Some(_) => Err(AppError::bad_request("URLs must be a list")),
        }
    }

    pub fn items(&self) -> Vec<BulkItem> {
        self.urls
            .iter()
            .map(|value| match value {
                Value::String(url) => BulkItem::Url(url.clone()),
                _ => BulkItem::NotString,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_url: String,
    pub short_code: String,
    pub original_url: String,
    pub existing: bool,
}

impl ShortenResponse {
    pub fn new(outcome: ShortenOutcome, base_url: &str) -> Self {
        Self {
            short_url: outcome.record.short_code.to_url(base_url),
            short_code: outcome.record.short_code.to_string(),
            original_url: outcome.record.original_url,
            existing: !outcome.created,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BulkResultItem {
    Shortened(ShortenResponse),
    Failed { original_url: Value, error: String },
}

#[derive(Debug, Serialize)]
pub struct BulkShortenResponse {
    pub results: Vec<BulkResultItem>,
    pub total_processed: usize,
    pub new_urls: usize,
    pub existing_urls: usize,
    pub errors: usize,
}

impl BulkShortenResponse {
    /// Pairs each outcome with the raw input it came from.
    pub fn new(request: BulkShortenRequest, report: BulkReport, base_url: &str) -> Self {
        let total_processed = report.total_processed();
        let new_urls = report.new_urls();
        let existing_urls = report.existing_urls();
        let errors = report.errors();

        let results = request
            .urls
            .into_iter()
            .zip(report.outcomes)
            .map(|(raw, outcome)| match outcome {
                BulkOutcome::Shortened(outcome) => {
                    BulkResultItem::Shortened(ShortenResponse::new(outcome, base_url))
                }
                BulkOutcome::Failed { reason } => BulkResultItem::Failed {
                    original_url: raw,
                    error: reason,
                },
            })
            .collect();

        Self {
            results,
            total_processed,
            new_urls,
            existing_urls,
            errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub original_url: String,
    pub created_at: Timestamp,
    pub clicks: u64,
}

impl From<UrlRecord> for StatsResponse {
    fn from(record: UrlRecord) -> Self {
        Self {
            original_url: record.original_url,
            created_at: record.created_at,
            clicks: record.clicks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListItem {
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: Timestamp,
    pub clicks: u64,
}

impl ListItem {
    pub fn new(record: UrlRecord, base_url: &str) -> Self {
        Self {
            short_url: record.short_code.to_url(base_url),
            short_code: record.short_code.to_string(),
            original_url: record.original_url,
            created_at: record.created_at,
            clicks: record.clicks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
