//! Cache Contract
//!
//! The capability set every cache backend implements. [`MemKvc`](super::MemKvc)
//! is the in-process implementation; other backends (a remote store, for
//! instance) can implement the same traits.

use std::time::Duration;

// == Entry View ==
/// Read-only view of a backend's entries while its write lock is held.
///
/// Handed to [`Kvc::compare_and_set`] predicates so they can inspect the
/// store without re-entering the cache.
pub trait EntryView<K, V> {
    /// Returns the live value for `key`, if any.
    fn peek(&self, key: &K) -> Option<&V>;

    /// Returns true if `key` holds a live value.
    fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }
}

// == Key Value Cache ==
/// Key-value cache contract.
///
/// Absence is always expressed as `None`, both in results (`get`) and in
/// writes (`set(key, None)` removes the key). No operation returns an error.
///
/// # Callbacks
/// `get_and_set` and `compare_and_set` run their callback while holding the
/// backend's exclusive lock. A callback must not call any other method of the
/// same cache and must not block: every other operation on the instance waits
/// for it to return.
pub trait Kvc<K, V>: Send + Sync {
    /// View passed to `compare_and_set` predicates.
    type View: EntryView<K, V>;

    /// Returns the current value for `key`, or `None` if it is not present.
    fn get(&self, key: &K) -> Option<V>;

    /// Returns true if `key` is present.
    fn has(&self, key: &K) -> bool;

    /// Stores `value` at `key`, or removes `key` when `value` is `None`.
    fn set(&self, key: K, value: Option<V>);

    /// Like [`set`](Self::set), and additionally clears `key` once `ttl` has elapsed.
    fn set_ttl(&self, key: K, value: Option<V>, ttl: Duration);

    /// Atomically replaces the value at `key` with `transform(current)`.
    ///
    /// A `None` result removes the key.
    fn get_and_set<F>(&self, key: K, transform: F)
    where
        F: FnOnce(Option<V>) -> Option<V>;

    /// Writes `value` at `key` if `predicate` returns true, atomically.
    ///
    /// Returns the predicate's result. When it is false the store is left
    /// unchanged.
    fn compare_and_set<P>(&self, key: K, value: Option<V>, predicate: P) -> bool
    where
        P: FnOnce(&Self::View) -> bool;

    /// Removes `key`. Shorthand for `set(key, None)`.
    fn remove(&self, key: K) {
        self.set(key, None);
    }
}
