//! kvc - demo and load driver for the in-memory cache
//!
//! Hammers a shared counter from concurrent workers through `get_and_set`,
//! then exercises TTL expiry and prints cache statistics.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvc::{Config, Kvc, MemKvc};

const COUNTER_KEY: &str = "counter";
const SESSION_KEY: &str = "session";

/// Main entry point for the demo driver.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Run concurrent atomic increments and verify the total
/// 4. Store a TTL'd key and wait for it to expire
/// 5. Print statistics as JSON
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kvc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: expiry_policy={}, reentrancy_check={}, workers={}, increments={}, ttl={}ms",
        config.expiry_policy,
        config.reentrancy_check,
        config.demo_workers,
        config.demo_increments,
        config.demo_ttl_ms
    );

    let cache: MemKvc<String, u64> = MemKvc::with_config(&config)?;

    run_counter(&cache, &config).await?;
    run_ttl(&cache, &config).await?;

    let stats = cache.stats();
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
    );
    info!("Hit rate: {:.2}", stats.hit_rate());

    Ok(())
}

/// Runs `demo_workers` blocking workers that each increment the counter.
async fn run_counter(cache: &MemKvc<String, u64>, config: &Config) -> Result<()> {
    cache.set(COUNTER_KEY.to_string(), Some(0));

    let mut handles = Vec::with_capacity(config.demo_workers);
    for _ in 0..config.demo_workers {
        let cache = cache.clone();
        let increments = config.demo_increments;
        handles.push(tokio::task::spawn_blocking(move || {
            for _ in 0..increments {
                cache.get_and_set(COUNTER_KEY.to_string(), |current| {
                    Some(current.unwrap_or(0) + 1)
                });
            }
        }));
    }
    for handle in handles {
        handle.await.context("Counter worker panicked")?;
    }

    let expected = config.demo_workers as u64 * config.demo_increments;
    let actual = cache.get(&COUNTER_KEY.to_string()).unwrap_or(0);
    if actual != expected {
        bail!("Lost updates: expected {}, got {}", expected, actual);
    }
    info!("Counter reached {} with no lost updates", actual);
    Ok(())
}

/// Stores a session key with a TTL and checks it is gone after the deadline.
async fn run_ttl(cache: &MemKvc<String, u64>, config: &Config) -> Result<()> {
    let ttl = Duration::from_millis(config.demo_ttl_ms);
    cache.set_ttl(SESSION_KEY.to_string(), Some(1), ttl);

    if !cache.has(&SESSION_KEY.to_string()) {
        bail!("Session key missing right after set_ttl");
    }

    tokio::time::sleep(ttl * 2).await;

    if cache.has(&SESSION_KEY.to_string()) {
        warn!("Session key still present after {:?}", ttl * 2);
    } else {
        info!("Session key expired after {:?}", ttl);
    }
    Ok(())
}
