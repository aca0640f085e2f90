//! The URL store.
//!
//! [`UrlStore`] implements the [`Shortener`](snip_core::Shortener) contract
//! on top of any [`Repository`](snip_core::Repository) backend and
//! [`Generator`](snip_generator::Generator). Core types are re-exported from
//! `snip_core`.

pub mod service;
pub mod settings;

pub use service::UrlStore;
pub use settings::{StoreSettings, DEFAULT_MAX_CODE_ATTEMPTS};
pub use snip_core::{
    BulkItem, BulkOutcome, BulkReport, ShortCode, ShortenOutcome, Shortener, ShortenerError,
    UrlRecord,
};
