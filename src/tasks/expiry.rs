//! TTL Expiry Task
//!
//! Deferred tasks that clear a key once its TTL has elapsed. Each cache owns
//! an [`ExpiryTimer`]: one background thread driving its own tokio runtime,
//! on which every scheduled clear is a sleeping task. Clears keep firing no
//! matter which runtime, if any, the cache's callers run on.

use std::thread;
use std::time::Duration;

use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{CacheError, Result};

type ExpiryJob = (Duration, Box<dyn FnOnce() + Send>);

// == Expiry Timer ==
/// Handle to a background expiry thread.
///
/// Clones share the same thread. The thread exits, dropping any clears still
/// pending, once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct ExpiryTimer {
    jobs: mpsc::UnboundedSender<ExpiryJob>,
}

impl ExpiryTimer {
    // == Start ==
    /// Spawns the `kvc-expiry` thread and its runtime.
    pub fn start() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|err| CacheError::TimerStart(err.to_string()))?;
        let (jobs, mut pending) = mpsc::unbounded_channel::<ExpiryJob>();

        thread::Builder::new()
            .name("kvc-expiry".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some((delay, action)) = pending.recv().await {
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            action();
                        });
                    }
                });
                debug!("Expiry timer stopped");
            })
            .map_err(|err| CacheError::TimerStart(err.to_string()))?;

        info!("Expiry timer started");
        Ok(Self { jobs })
    }

    /// A timer whose thread is already gone. Every scheduled clear is dropped.
    #[cfg(test)]
    pub(crate) fn stopped() -> Self {
        let (jobs, _) = mpsc::unbounded_channel();
        Self { jobs }
    }

    // == Schedule ==
    /// Runs `action` on the timer thread once `delay` has elapsed.
    ///
    /// # Example
    /// ```ignore
    /// let timer = ExpiryTimer::start()?;
    /// timer.schedule(Duration::from_millis(50), move || cache.remove(key));
    /// ```
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.jobs.send((delay, Box::new(action))).is_err() {
            error!(?delay, "Expiry timer thread is gone, TTL clear dropped");
        }
    }
}
