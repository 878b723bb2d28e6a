//! Cache Module
//!
//! Provides the cache contract and its concurrency-safe in-memory implementation.

mod contract;
mod entry;
mod mem;
mod reentry;
mod stats;
mod store;


// Re-export public types
pub use contract::{EntryView, Kvc};
pub(crate) use entry::CacheEntry;
pub use mem::MemKvc;
pub use stats::CacheStats;
pub use store::Entries;
