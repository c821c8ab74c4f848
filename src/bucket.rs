//! Bucket admission math.
//!
//! Both algorithms are pure functions over a [`BucketState`] snapshot. Stores
//! own the state and decide how the read-compute-write sequence is made atomic.

use std::fmt;

use crate::{BucketConfig, RateLimitResult};

/// Per-key state kept by a store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketState {
    /// Tokens available (token bucket) or current fill (leaky bucket).
    /// Always within `0..=capacity`.
    pub level: f64,
    /// Clock reading of the last refill or leak computation.
    pub last_update: f64,
}

/// Admission algorithm applied by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketAlgorithm {
    /// Starts full; each admitted request takes one token; tokens refill at `rate`.
    TokenBucket,
    /// Starts empty; each admitted request adds one unit of fill; fill drains at
    /// `rate`; requests arriving while the bucket is full are rejected.
    LeakyBucket,
}

impl BucketAlgorithm {
    /// State of a key that has never been seen.
    pub fn initial_state(self, config: &BucketConfig, now: f64) -> BucketState {
        let level = match self {
            BucketAlgorithm::TokenBucket => *config.capacity,
            BucketAlgorithm::LeakyBucket => 0f64,
        };

        BucketState {
            level,
            last_update: now,
        }
    }

    /// Advance `state` to `now` and decide one request.
    ///
    /// The returned state must be persisted whatever the decision.
    pub fn apply(
        self,
        config: &BucketConfig,
        state: BucketState,
        now: f64,
    ) -> (BucketState, RateLimitResult) {
        let capacity = *config.capacity;
        let level = self.level_at(config, state, now);
        let last_update = state.last_update.max(now);

        match self {
            BucketAlgorithm::TokenBucket => {
                if level >= 1f64 {
                    let level = level - 1f64;
                    (
                        BucketState { level, last_update },
                        RateLimitResult::allowed(floor_units(level, capacity)),
                    )
                } else {
                    (
                        BucketState { level, last_update },
                        RateLimitResult::rejected(config.rate.seconds_for(1f64 - level)),
                    )
                }
            }
            BucketAlgorithm::LeakyBucket => {
                if level < capacity {
                    // A partly drained full bucket still admits; the fill saturates.
                    let level = (level + 1f64).min(capacity);
                    (
                        BucketState { level, last_update },
                        RateLimitResult::allowed(floor_units(capacity - level, capacity)),
                    )
                } else {
                    (
                        BucketState { level, last_update },
                        RateLimitResult::rejected(config.rate.seconds_for(1f64)),
                    )
                }
            }
        }
    }

    /// Whether `state` is indistinguishable from a fresh key at `now`.
    pub fn is_recovered(self, config: &BucketConfig, state: BucketState, now: f64) -> bool {
        let level = self.level_at(config, state, now);

        match self {
            BucketAlgorithm::TokenBucket => level >= *config.capacity,
            BucketAlgorithm::LeakyBucket => level <= 0f64,
        }
    }

    /// Short tag used to namespace keys in shared stores.
    pub fn key_tag(self) -> &'static str {
        match self {
            BucketAlgorithm::TokenBucket => "tb",
            BucketAlgorithm::LeakyBucket => "lb",
        }
    }

    fn level_at(self, config: &BucketConfig, state: BucketState, now: f64) -> f64 {
        let capacity = *config.capacity;
        let elapsed = (now - state.last_update).max(0f64);
        let delta = elapsed * *config.rate;

        match self {
            BucketAlgorithm::TokenBucket => (state.level + delta).clamp(0f64, capacity),
            BucketAlgorithm::LeakyBucket => (state.level - delta).clamp(0f64, capacity),
        }
    }
}

impl fmt::Display for BucketAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketAlgorithm::TokenBucket => write!(f, "token_bucket"),
            BucketAlgorithm::LeakyBucket => write!(f, "leaky_bucket"),
        }
    }
}

fn floor_units(units: f64, capacity: f64) -> u64 {
    units.clamp(0f64, capacity).floor() as u64
}
