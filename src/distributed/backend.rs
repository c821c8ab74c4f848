use std::sync::Arc;

use crate::{BucketAlgorithm, BucketConfig, RateLimitResult, SluiceError};

/// A shared store that can run one bucket decision indivisibly.
///
/// Implementations must guarantee that `evaluate` for a key is atomic with
/// respect to every other `evaluate` and `delete` on that key, from any
/// process, and that a failed call leaves no partial write behind.
pub trait AtomicBucketBackend: Send + Sync {
    /// Load or create the bucket for `key`, advance it to `now`, decide one
    /// request, persist the new state with an expiry, and return the decision.
    fn evaluate(
        &self,
        algorithm: BucketAlgorithm,
        key: &str,
        config: &BucketConfig,
        now: f64,
    ) -> Result<RateLimitResult, SluiceError>;

    /// Remove the bucket for `key`.
    fn delete(&self, algorithm: BucketAlgorithm, key: &str) -> Result<(), SluiceError>;
}

impl<T: AtomicBucketBackend + ?Sized> AtomicBucketBackend for Arc<T> {
    fn evaluate(
        &self,
        algorithm: BucketAlgorithm,
        key: &str,
        config: &BucketConfig,
        now: f64,
    ) -> Result<RateLimitResult, SluiceError> {
        (**self).evaluate(algorithm, key, config, now)
    }

    fn delete(&self, algorithm: BucketAlgorithm, key: &str) -> Result<(), SluiceError> {
        (**self).delete(algorithm, key)
    }
}
