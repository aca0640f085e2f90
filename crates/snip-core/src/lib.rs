//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the data model, the storage traits implemented by
//! the persistence backends and the [`Shortener`] contract that transports
//! call into.

pub mod error;
pub mod repository;
pub mod shortcode;
pub mod shortener;
pub mod url;

pub use error::{ShortenerError, StorageError};
pub use repository::{ReadRepository, Repository, UrlRecord};
pub use shortcode::ShortCode;
pub use shortener::{BulkItem, BulkOutcome, BulkReport, ShortenOutcome, Shortener, MAX_BULK_ITEMS};
pub use url::normalize_url;
