use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{
    BucketAlgorithm, BucketConfig, BucketState, Clock, LocalBucketOptions, RateLimitResult,
    RateLimiter, SluiceError, common::validate_key,
};

/// Token or leaky bucket limiter with per-key state held in memory.
///
/// # Algorithm
///
/// See [`BucketAlgorithm`]. The limiter only stores state and serializes
/// access to it.
///
/// # Thread Safety
///
/// - Uses [`DashMap`](dashmap::DashMap) for concurrent key access
/// - The refill-decide-write sequence for a key runs under its shard's write lock
/// - Callers never hold references into the map
///
/// # Memory growth
///
/// - Keys are created lazily and never expire on their own
/// - [`cleanup`](Self::cleanup) drops keys whose bucket has fully recovered;
///   a recovered bucket behaves exactly like a fresh one, so this is invisible
///   to callers
/// - [`run_cleanup_loop`](Self::run_cleanup_loop) runs that sweep periodically
/// - Buckets built with [`Rate::non_replenishing`](crate::Rate::non_replenishing)
///   never recover and are only dropped by [`reset`](RateLimiter::reset)
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use sluice::{Capacity, LocalBucketOptions, LocalBucketRateLimiter, ManualClock, Rate, RateLimiter};
///
/// let clock = Arc::new(ManualClock::new(0.0));
/// let limiter = LocalBucketRateLimiter::token_bucket(
///     LocalBucketOptions::new(Capacity::try_from(2.0).unwrap(), Rate::try_from(1.0).unwrap())
///         .with_clock(clock.clone()),
/// );
///
/// assert!(limiter.allow_request("user_123").unwrap().allowed);
/// assert!(limiter.allow_request("user_123").unwrap().allowed);
///
/// let rejected = limiter.allow_request("user_123").unwrap();
/// assert!(!rejected.allowed);
/// assert_eq!(rejected.retry_after, Some(1.0));
///
/// clock.advance(1.0);
/// assert!(limiter.allow_request("user_123").unwrap().allowed);
/// ```
#[derive(Debug)]
pub struct LocalBucketRateLimiter {
    algorithm: BucketAlgorithm,
    config: BucketConfig,
    clock: Arc<dyn Clock>,
    buckets: DashMap<String, BucketState>,
    cleanup_stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl LocalBucketRateLimiter {
    /// Create a limiter applying `algorithm`.
    pub fn new(algorithm: BucketAlgorithm, options: LocalBucketOptions) -> Self {
        Self {
            algorithm,
            config: options.bucket_config(),
            clock: options.clock,
            buckets: DashMap::new(),
            cleanup_stop: Mutex::new(None),
        }
    } // end constructor

    /// Token bucket kept in process.
    pub fn token_bucket(options: LocalBucketOptions) -> Self {
        Self::new(BucketAlgorithm::TokenBucket, options)
    }

    /// Leaky bucket kept in process.
    pub fn leaky_bucket(options: LocalBucketOptions) -> Self {
        Self::new(BucketAlgorithm::LeakyBucket, options)
    }

    /// Algorithm applied by this limiter.
    pub fn algorithm(&self) -> BucketAlgorithm {
        self.algorithm
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn buckets(&self) -> &DashMap<String, BucketState> {
        &self.buckets
    }

    fn decide(&self, state: &mut BucketState) -> RateLimitResult {
        let (next, result) = self.algorithm.apply(&self.config, *state, self.clock.now());
        *state = next;
        result
    }

    /// Drop every key whose bucket has fully recovered.
    ///
    /// Returns the number of keys removed.
    pub fn cleanup(&self) -> usize {
        let before = self.buckets.len();
        let now = self.clock.now();

        self.buckets
            .retain(|_, state| !self.algorithm.is_recovered(&self.config, *state, now));

        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(
                algorithm = %self.algorithm,
                removed,
                "local.cleanup, evicted recovered buckets"
            );
        }

        removed
    } // end method cleanup

    /// Run [`cleanup`](Self::cleanup) every `interval` on a background thread.
    ///
    /// The thread holds only a weak reference and exits once the limiter is
    /// dropped. Returns the thread's handle, or `None` when a loop is already
    /// running or the thread could not be spawned.
    pub fn run_cleanup_loop(self: &Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        let stop = {
            let mut cleanup_stop = self.cleanup_stop.lock();
            if cleanup_stop.is_some() {
                return None;
            }

            let stop = Arc::new(AtomicBool::new(false));
            *cleanup_stop = Some(stop.clone());
            stop
        };

        let limiter = Arc::downgrade(self);

        let spawned = thread::Builder::new()
            .name("sluice-cleanup".to_string())
            .spawn(move || {
                loop {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }

                    let Some(limiter) = limiter.upgrade() else {
                        break;
                    };

                    limiter.cleanup();
                    drop(limiter);

                    thread::sleep(interval);
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(
                    error = ?err,
                    "local.cleanup.error, failed to spawn cleanup thread"
                );
                self.cleanup_stop.lock().take();
                None
            }
        }
    } // end method run_cleanup_loop

    /// Stop the loop started by [`run_cleanup_loop`](Self::run_cleanup_loop).
    /// Does nothing if no loop is running.
    pub fn stop_cleanup_loop(&self) {
        if let Some(stop) = self.cleanup_stop.lock().take() {
            stop.store(true, Ordering::Relaxed);
        }
    }
} // end of impl

impl RateLimiter for LocalBucketRateLimiter {
    fn allow_request(&self, key: &str) -> Result<RateLimitResult, SluiceError> {
        validate_key(key)?;

        let result = if let Some(mut state) = self.buckets.get_mut(key) {
            self.decide(&mut state)
        } else {
            let mut state = self.buckets.entry(key.to_string()).or_insert_with(|| {
                tracing::debug!(key, algorithm = %self.algorithm, "local.bucket.created");
                self.algorithm.initial_state(&self.config, self.clock.now())
            });

            self.decide(&mut state)
        };

        tracing::trace!(
            key,
            algorithm = %self.algorithm,
            allowed = result.allowed,
            remaining = result.remaining,
            "local.bucket.decision"
        );

        Ok(result)
    } // end method allow_request

    fn reset(&self, key: &str) -> Result<(), SluiceError> {
        validate_key(key)?;

        if self.buckets.remove(key).is_some() {
            tracing::debug!(key, algorithm = %self.algorithm, "local.bucket.reset");
        }

        Ok(())
    }
}
