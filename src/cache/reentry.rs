//! Re-entrancy detection for atomic callbacks.
//!
//! Each thread gets a nonzero token. While a `get_and_set` or
//! `compare_and_set` callback runs, the cache records the token of the thread
//! executing it; any cache call from that same thread then fails fast instead
//! of deadlocking on its own lock.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CacheError;

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

fn current_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

// == Callback Owner ==
/// Token of the thread currently running an atomic callback, 0 when none.
///
/// Only written while the exclusive lock is held. A thread only ever compares
/// against its own token, so relaxed ordering is enough.
#[derive(Debug)]
pub(crate) struct CallbackOwner {
    owner: AtomicU64,
    enabled: bool,
}

impl CallbackOwner {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            owner: AtomicU64::new(0),
            enabled,
        }
    }

    /// Panics if the calling thread is inside one of this cache's callbacks.
    pub(crate) fn check(&self) {
        if self.enabled && self.owner.load(Ordering::Relaxed) == current_token() {
            panic!("{}", CacheError::ReentrantLock);
        }
    }

    /// Marks the calling thread as running a callback until the scope drops.
    pub(crate) fn enter(&self) -> CallbackScope<'_> {
        if self.enabled {
            self.owner.store(current_token(), Ordering::Relaxed);
        }
        CallbackScope { owner: self }
    }
}

/// Clears the callback owner on drop, including during unwinding.
pub(crate) struct CallbackScope<'a> {
    owner: &'a CallbackOwner,
}

impl Drop for CallbackScope<'_> {
    fn drop(&mut self) {
        if self.owner.enabled {
            self.owner.owner.store(0, Ordering::Relaxed);
        }
    }
}
