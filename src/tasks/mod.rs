//! Background Tasks Module
//!
//! Contains deferred tasks that run out of band of cache callers.
//!
//! # Tasks
//! - TTL Expiry: clears a key once the TTL given to `set_ttl` has elapsed

mod expiry;

pub use expiry::ExpiryTimer;
