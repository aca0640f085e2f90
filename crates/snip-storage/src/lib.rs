//! Persistence backends for the snip URL store.
//!
//! Every backend implements [`Repository`] with the same contract: both the
//! short code and the original URL are unique at insert time, clicks are
//! incremented atomically and a successful write is durable.

pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::JsonFileRepository;
pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

pub use snip_core::error::StorageError;
pub use snip_core::repository::{ReadRepository, Repository};
