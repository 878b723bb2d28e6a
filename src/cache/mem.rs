//! In-Memory Cache Module
//!
//! [`MemKvc`] implements [`Kvc`] on top of a single [`EntryStore`]: one
//! reader-writer lock for all keys, atomic updates that hold the write lock
//! across their callback, and TTL clears scheduled on an [`ExpiryTimer`].

use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use super::reentry::CallbackOwner;
use super::stats::StatsCounters;
use super::store::{Entries, EntryStore};
use crate::cache::{CacheStats, Kvc};
use crate::config::{Config, ExpiryPolicy};
use crate::error::Result;
use crate::tasks::ExpiryTimer;

// == Shared State ==
struct Shared<K, V> {
    store: EntryStore<K, V>,
    stats: StatsCounters,
    callback_owner: CallbackOwner,
    timer: ExpiryTimer,
    expiry_policy: ExpiryPolicy,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash,
{
    // == Expire ==
    /// Runs a scheduled TTL clear through the exclusive lock.
    fn expire(&self, key: &K, expected: Option<u64>) {
        let removed = self.store.write().clear_expired(key, expected);
        if removed {
            self.stats.record_expiration();
            debug!(generation = ?expected, "TTL clear removed entry");
        } else {
            debug!(generation = ?expected, "TTL clear skipped, entry gone or rewritten");
        }
    }
}

// == Mem Kvc ==
/// Concurrency-safe in-memory key-value cache.
///
/// Cloning yields another handle to the same cache.
///
/// # Panics
/// With `Config::reentrancy_check` enabled (the default), any call made from
/// inside a `get_and_set` or `compare_and_set` callback on the same instance
/// panics with [`CacheError::ReentrantLock`](crate::error::CacheError)
/// instead of deadlocking. The lock is released during unwinding.
pub struct MemKvc<K, V> {
    inner: Arc<Shared<K, V>>,
}

impl<K, V> Clone for MemKvc<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> MemKvc<K, V>
where
    K: Eq + Hash,
{
    // == Constructor ==
    /// Creates a new, empty cache with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&Config::default())
    }

    /// Creates a new, empty cache with its own expiry thread.
    pub fn with_config(config: &Config) -> Result<Self> {
        Ok(Self::with_timer(config, ExpiryTimer::start()?))
    }

    /// Creates a new, empty cache whose TTL clears run on `timer`.
    ///
    /// Several caches may share one timer by passing clones of it.
    pub fn with_timer(config: &Config, timer: ExpiryTimer) -> Self {
        Self {
            inner: Arc::new(Shared {
                store: EntryStore::new(),
                stats: StatsCounters::default(),
                callback_owner: CallbackOwner::new(config.reentrancy_check),
                timer,
                expiry_policy: config.expiry_policy,
            }),
        }
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.inner.callback_owner.check();
        self.inner.store.read().len()
    }

    // == Is Empty ==
    /// Returns true if the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.len())
    }

    /// Returns the policy applied by scheduled TTL clears.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.inner.expiry_policy
    }
}

impl<K, V> Kvc<K, V> for MemKvc<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type View = Entries<K, V>;

    fn get(&self, key: &K) -> Option<V> {
        self.inner.callback_owner.check();
        let entries = self.inner.store.read();
        let value = entries.peek(key).cloned();
        self.inner.stats.record_lookup(value.is_some());
        value
    }

    fn has(&self, key: &K) -> bool {
        self.inner.callback_owner.check();
        self.inner.store.read().contains(key)
    }

    fn set(&self, key: K, value: Option<V>) {
        self.inner.callback_owner.check();
        self.inner.store.write().put(key, value, None);
    }

    fn set_ttl(&self, key: K, value: Option<V>, ttl: Duration) {
        self.inner.callback_owner.check();
        let generation = self.inner.store.write().put(key.clone(), value, Some(ttl));

        let expected = match self.inner.expiry_policy {
            ExpiryPolicy::Generation => match generation {
                Some(generation) => Some(generation),
                // Nothing was stored, so nothing can expire
                None => return,
            },
            ExpiryPolicy::Absolute => None,
        };

        debug!(
            ttl = ?ttl,
            generation = ?expected,
            policy = %self.inner.expiry_policy,
            "Scheduling TTL clear"
        );

        let shared: Weak<Shared<K, V>> = Arc::downgrade(&self.inner);
        self.inner.timer.schedule(ttl, move || {
            if let Some(shared) = shared.upgrade() {
                shared.expire(&key, expected);
            }
        });
    }

    fn get_and_set<F>(&self, key: K, transform: F)
    where
        F: FnOnce(Option<V>) -> Option<V>,
    {
        self.inner.callback_owner.check();
        let mut entries = self.inner.store.write();
        let _scope = self.inner.callback_owner.enter();

        // Clone rather than take so a panicking transform leaves the entry intact
        let current = entries.peek(&key).cloned();
        let next = transform(current);
        entries.put(key, next, None);
    }

    fn compare_and_set<P>(&self, key: K, value: Option<V>, predicate: P) -> bool
    where
        P: FnOnce(&Self::View) -> bool,
    {
        self.inner.callback_owner.check();
        let mut entries = self.inner.store.write();
        let _scope = self.inner.callback_owner.enter();

        let ok = predicate(&*entries);
        if ok {
            entries.put(key, value, None);
        }
        ok
    }
}
