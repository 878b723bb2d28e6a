//! Entry Store Module
//!
//! HashMap storage behind a reader-writer lock. The map itself ([`Entries`])
//! is only reachable through a lock guard, so its accessors never lock and
//! can never be called without the lock held.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::{CacheEntry, EntryView};

// == Entries ==
/// The cached entries, as seen through a held lock.
#[derive(Debug)]
pub struct Entries<K, V> {
    /// Key-value storage
    items: HashMap<K, CacheEntry<V>>,
    /// Generation assigned to the next write
    next_generation: u64,
}

impl<K, V> Entries<K, V>
where
    K: Eq + Hash,
{
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            next_generation: 1,
        }
    }

    // == Peek ==
    /// Returns the live value for `key`.
    ///
    /// Entries past their deadline read as absent even before their
    /// scheduled clear has run.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.items
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    // == Contains ==
    /// Returns true if `key` holds a live value.
    pub fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    // == Generation ==
    /// Returns the write generation of the entry at `key`, live or not.
    pub fn generation(&self, key: &K) -> Option<u64> {
        self.items.get(key).map(|entry| entry.generation)
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.items
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    // == Is Empty ==
    /// Returns true if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Put ==
    /// Inserts or overwrites `key`, or removes it when `value` is `None`.
    ///
    /// Returns the generation assigned to the new entry, or `None` for a removal.
    pub(crate) fn put(&mut self, key: K, value: Option<V>, ttl: Option<Duration>) -> Option<u64> {
        match value {
            Some(value) => {
                let generation = self.next_generation;
                self.next_generation += 1;
                self.items
                    .insert(key, CacheEntry::new(value, generation, ttl));
                Some(generation)
            }
            None => {
                self.items.remove(&key);
                None
            }
        }
    }

    // == Clear Expired ==
    /// Removes `key` on behalf of a scheduled TTL clear.
    ///
    /// With `expected` set, the entry is only removed if it still carries that
    /// generation. With `None`, it is removed unconditionally.
    /// Returns true if an entry was removed.
    pub(crate) fn clear_expired(&mut self, key: &K, expected: Option<u64>) -> bool {
        match expected {
            Some(generation) if self.generation(key) != Some(generation) => false,
            _ => self.items.remove(key).is_some(),
        }
    }
}

impl<K, V> EntryView<K, V> for Entries<K, V>
where
    K: Eq + Hash,
{
    fn peek(&self, key: &K) -> Option<&V> {
        Entries::peek(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        Entries::contains(self, key)
    }
}

// == Entry Store ==
/// Entries plus the lock protecting them. The lock is never exposed.
#[derive(Debug)]
pub(crate) struct EntryStore<K, V> {
    entries: RwLock<Entries<K, V>>,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::new()),
        }
    }

    /// Acquires the shared lock. Released when the guard drops.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Entries<K, V>> {
        self.entries.read()
    }

    /// Acquires the exclusive lock. Released when the guard drops.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Entries<K, V>> {
        self.entries.write()
    }
}
