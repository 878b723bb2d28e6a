//! kvc - A concurrency-safe in-memory key-value cache
//!
//! Provides a small cache contract ([`Kvc`]) with an in-process
//! implementation ([`MemKvc`]) supporting atomic updates and TTL expiry.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, EntryView, Kvc, MemKvc};
pub use config::{Config, ExpiryPolicy};
pub use error::CacheError;
