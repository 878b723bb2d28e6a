//! Configuration Module
//!
//! Handles loading cache and demo driver configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

// == Expiry Policy ==
/// What a scheduled TTL clear does when it fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Only clear the key if it has not been written since the TTL was set.
    /// Any later write cancels the pending expiry.
    #[default]
    Generation,
    /// Clear the key at the deadline regardless of intervening writes.
    Absolute,
}

impl FromStr for ExpiryPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generation" | "guarded" => Ok(ExpiryPolicy::Generation),
            "absolute" | "deadline" => Ok(ExpiryPolicy::Absolute),
            _ => Err(CacheError::InvalidConfig(format!(
                "Unknown expiry policy: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryPolicy::Generation => write!(f, "generation"),
            ExpiryPolicy::Absolute => write!(f, "absolute"),
        }
    }
}

/// Cache and demo driver configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Behavior of scheduled TTL clears
    pub expiry_policy: ExpiryPolicy,
    /// Fail fast instead of deadlocking when an atomic callback re-enters the cache
    pub reentrancy_check: bool,
    /// Number of concurrent workers run by the demo driver
    pub demo_workers: usize,
    /// Increments performed by each demo worker
    pub demo_increments: u64,
    /// TTL in milliseconds of the demo session key
    pub demo_ttl_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KVC_EXPIRY_POLICY` - `generation` or `absolute` (default: generation)
    /// - `KVC_REENTRANCY_CHECK` - Detect re-entrant access (default: true)
    /// - `KVC_DEMO_WORKERS` - Demo worker count (default: 8)
    /// - `KVC_DEMO_INCREMENTS` - Increments per demo worker (default: 1000)
    /// - `KVC_DEMO_TTL_MS` - Demo session TTL in milliseconds (default: 200)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            expiry_policy: env::var("KVC_EXPIRY_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.expiry_policy),
            reentrancy_check: env::var("KVC_REENTRANCY_CHECK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reentrancy_check),
            demo_workers: env::var("KVC_DEMO_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.demo_workers),
            demo_increments: env::var("KVC_DEMO_INCREMENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.demo_increments),
            demo_ttl_ms: env::var("KVC_DEMO_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.demo_ttl_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expiry_policy: ExpiryPolicy::Generation,
            reentrancy_check: true,
            demo_workers: 8,
            demo_increments: 1000,
            demo_ttl_ms: 200,
        }
    }
}
