//! The capability every limiter exposes.
//!
//! Four limiters implement it: token and leaky buckets, each kept either in
//! process ([`LocalBucketRateLimiter`](crate::LocalBucketRateLimiter)) or in a
//! shared store ([`DistributedBucketRateLimiter`](crate::DistributedBucketRateLimiter)).
//! Callers should depend on this trait rather than a concrete limiter.

use std::sync::Arc;

use crate::{RateLimitResult, SluiceError};

/// Per-key admission control.
pub trait RateLimiter: Send + Sync {
    /// Decide one request for `key`, creating its bucket on first use.
    ///
    /// Returns `Ok` with `allowed == false` when the key is over its budget.
    /// Errors mean no decision was made: the key was invalid or the backing
    /// store failed.
    fn allow_request(&self, key: &str) -> Result<RateLimitResult, SluiceError>;

    /// Forget `key`; its next request behaves like a first-ever request.
    fn reset(&self, key: &str) -> Result<(), SluiceError>;
}

impl<T: RateLimiter + ?Sized> RateLimiter for Arc<T> {
    fn allow_request(&self, key: &str) -> Result<RateLimitResult, SluiceError> {
        (**self).allow_request(key)
    }

    fn reset(&self, key: &str) -> Result<(), SluiceError> {
        (**self).reset(key)
    }
}

impl<T: RateLimiter + ?Sized> RateLimiter for Box<T> {
    fn allow_request(&self, key: &str) -> Result<RateLimitResult, SluiceError> {
        (**self).allow_request(key)
    }

    fn reset(&self, key: &str) -> Result<(), SluiceError> {
        (**self).reset(key)
    }
}
