//! Integration Tests for the in-memory cache
//!
//! Exercises the public contract across threads and through real TTL timers.

use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use kvc::{Config, ExpiryPolicy, Kvc, MemKvc};

// == Helper Functions ==

fn cache_with_policy(policy: ExpiryPolicy) -> MemKvc<&'static str, &'static str> {
    let config = Config {
        expiry_policy: policy,
        ..Config::default()
    };
    MemKvc::with_config(&config).unwrap()
}

fn run_concurrent_increments(n: usize) -> u64 {
    let cache: MemKvc<&'static str, u64> = MemKvc::new().unwrap();
    cache.set("counter", Some(0));
    let barrier = Barrier::new(n);

    thread::scope(|scope| {
        for _ in 0..n {
            scope.spawn(|| {
                barrier.wait();
                cache.get_and_set("counter", |current| Some(current.unwrap_or(0) + 1));
            });
        }
    });

    cache.get(&"counter").unwrap_or(0)
}

// == Basic Contract ==

#[test]
fn test_unset_key_is_absent() {
    let cache: MemKvc<u32, String> = MemKvc::new().unwrap();

    for key in 0..100 {
        assert_eq!(cache.get(&key), None);
        assert!(!cache.has(&key));
    }
}

#[test]
fn test_set_then_clear() {
    let cache: MemKvc<String, Vec<u8>> = MemKvc::new().unwrap();

    cache.set("blob".to_string(), Some(vec![1, 2, 3]));
    assert_eq!(cache.get(&"blob".to_string()), Some(vec![1, 2, 3]));
    assert!(cache.has(&"blob".to_string()));

    cache.set("blob".to_string(), None);
    assert!(!cache.has(&"blob".to_string()));
}

// == Concurrency ==

#[test]
fn test_get_and_set_no_lost_updates() {
    for n in [1, 10, 1000] {
        assert_eq!(run_concurrent_increments(n), n as u64, "Lost updates with N={}", n);
    }
}

#[test]
fn test_concurrent_readers_see_valid_values() {
    let cache: MemKvc<&'static str, u64> = MemKvc::new().unwrap();
    cache.set("stable", Some(0));

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..1_000u64 {
                cache.set("stable", Some(i % 4));
            }
        });

        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..5_000 {
                    let value = cache.get(&"stable");
                    assert!(matches!(value, Some(v) if v < 4), "Torn read: {:?}", value);
                    assert!(cache.has(&"stable"));
                }
            });
        }
    });
}

#[test]
fn test_compare_and_set_elects_single_winner() {
    let cache: MemKvc<&'static str, usize> = MemKvc::new().unwrap();
    let barrier = Barrier::new(16);

    let winners: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|id| {
                let cache = &cache;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    cache.compare_and_set("leader", Some(id), |entries| {
                        !entries.contains(&"leader")
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count()
    });

    assert_eq!(winners, 1);
    assert!(cache.has(&"leader"));
}

// == TTL Expiry ==

#[tokio::test]
async fn test_ttl_expires_entry() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);

    cache.set_ttl("k", Some("v"), Duration::from_millis(50));
    assert_eq!(cache.get(&"k"), Some("v"));

    tokio::time::sleep(Duration::from_millis(25)).await;
    assert_eq!(cache.get(&"k"), Some("v"));

    tokio::time::sleep(Duration::from_millis(75)).await;
    assert!(!cache.has(&"k"));
    assert_eq!(cache.stats().expirations, 1);
}

#[test]
fn test_ttl_expires_entry_without_runtime() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);

    cache.set_ttl("k", Some("v"), Duration::from_millis(50));
    assert!(cache.has(&"k"));

    thread::sleep(Duration::from_millis(150));
    assert!(!cache.has(&"k"));
    assert_eq!(cache.stats().expirations, 1);
}

// == TTL Across Runtimes ==

fn build_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn test_absolute_clear_fires_after_builder_runtime_dropped() {
    let runtime = build_runtime();
    let cache = runtime.block_on(async { cache_with_policy(ExpiryPolicy::Absolute) });
    drop(runtime);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    thread::sleep(Duration::from_millis(10));
    cache.set("k", Some("v2"));

    thread::sleep(Duration::from_millis(140));
    assert!(!cache.has(&"k"));
    assert_eq!(cache.stats().expirations, 1);
}

#[test]
fn test_expired_entries_removed_after_builder_runtime_dropped() {
    let runtime = build_runtime();
    let cache: MemKvc<u32, u32> = runtime.block_on(async { MemKvc::new().unwrap() });
    drop(runtime);

    for key in 0..1000 {
        cache.set_ttl(key, Some(key), Duration::from_millis(5));
    }

    thread::sleep(Duration::from_millis(200));
    assert!(cache.is_empty());
    // Every entry physically removed, not just hidden by its deadline
    assert_eq!(cache.stats().expirations, 1000);
}

#[tokio::test]
async fn test_ttl_clear_fires_while_caller_runtime_blocked() {
    let cache = cache_with_policy(ExpiryPolicy::Absolute);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    cache.set("k", Some("v2"));

    // Blocks the test runtime's only thread for the whole window
    thread::sleep(Duration::from_millis(150));
    assert!(!cache.has(&"k"));
    assert_eq!(cache.stats().expirations, 1);
}

// Generation policy: a write during the TTL window cancels the pending clear,
// so the newer value survives the original deadline.
#[tokio::test]
async fn test_ttl_race_overwrite_survives_with_generation_policy() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.set("k", Some("v2"));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert_eq!(cache.get(&"k"), Some("v2"));
    assert_eq!(cache.stats().expirations, 0);
}

// Absolute policy: the clear fires at the original deadline and deletes
// whatever is stored then, including the unrelated overwrite.
#[tokio::test]
async fn test_ttl_race_overwrite_cleared_with_absolute_policy() {
    let cache = cache_with_policy(ExpiryPolicy::Absolute);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.set("k", Some("v2"));
    assert_eq!(cache.get(&"k"), Some("v2"));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert!(!cache.has(&"k"));
}

// Generation policy: atomic writes during the TTL window cancel the pending
// clear just like `set`.
#[tokio::test]
async fn test_ttl_get_and_set_cancels_expiry_with_generation_policy() {
    let cache: MemKvc<&'static str, u64> = MemKvc::new().unwrap();

    cache.set_ttl("hits", Some(1), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.get_and_set("hits", |current| current.map(|n| n + 1));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert_eq!(cache.get(&"hits"), Some(2));
    assert_eq!(cache.stats().expirations, 0);
}

#[tokio::test]
async fn test_ttl_compare_and_set_cancels_expiry_with_generation_policy() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(cache.compare_and_set("k", Some("v2"), |entries| {
        entries.peek(&"k") == Some(&"v1")
    }));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert_eq!(cache.get(&"k"), Some("v2"));
}

// Absolute policy: atomic writes do not save the key from its deadline.
#[tokio::test]
async fn test_ttl_get_and_set_cleared_with_absolute_policy() {
    let config = Config {
        expiry_policy: ExpiryPolicy::Absolute,
        ..Config::default()
    };
    let cache: MemKvc<&'static str, u64> = MemKvc::with_config(&config).unwrap();

    cache.set_ttl("hits", Some(1), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.get_and_set("hits", |current| current.map(|n| n + 1));
    assert_eq!(cache.get(&"hits"), Some(2));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert!(!cache.has(&"hits"));
}

#[tokio::test]
async fn test_ttl_compare_and_set_cleared_with_absolute_policy() {
    let cache = cache_with_policy(ExpiryPolicy::Absolute);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(cache.compare_and_set("k", Some("v2"), |_| true));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert!(!cache.has(&"k"));
}

// Absolute policy: set_ttl with no value still schedules its clear, which
// later removes a value written in the meantime.
#[tokio::test]
async fn test_ttl_absent_value_still_schedules_clear_with_absolute_policy() {
    let cache = cache_with_policy(ExpiryPolicy::Absolute);

    cache.set_ttl("k", None, Duration::from_millis(50));
    assert!(!cache.has(&"k"));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.set("k", Some("v"));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert!(!cache.has(&"k"));
    assert_eq!(cache.stats().expirations, 1);
}

#[tokio::test]
async fn test_ttl_absent_value_schedules_nothing_with_generation_policy() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);

    cache.set_ttl("k", None, Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.set("k", Some("v"));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert_eq!(cache.get(&"k"), Some("v"));
}

#[tokio::test]
async fn test_ttl_refresh_extends_lifetime() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);

    cache.set_ttl("k", Some("v1"), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(30)).await;
    cache.set_ttl("k", Some("v2"), Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get(&"k"), Some("v2"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!cache.has(&"k"));
}

#[tokio::test]
async fn test_ttl_after_cache_dropped() {
    let cache = cache_with_policy(ExpiryPolicy::Generation);
    cache.set_ttl("k", Some("v"), Duration::from_millis(10));
    drop(cache);

    // The pending clear finds no cache and does nothing
    tokio::time::sleep(Duration::from_millis(30)).await;
}
