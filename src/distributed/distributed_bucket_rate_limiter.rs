use std::{fmt, sync::Arc};

use crate::{
    AtomicBucketBackend, BucketAlgorithm, BucketConfig, Clock, DistributedBucketOptions,
    RateLimitResult, RateLimiter, SluiceError, common::validate_key,
};

/// Token or leaky bucket limiter whose state lives in a shared store.
pub struct DistributedBucketRateLimiter {
    algorithm: BucketAlgorithm,
    config: BucketConfig,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn AtomicBucketBackend>,
}

impl DistributedBucketRateLimiter {
    /// Create a limiter applying `algorithm` through `backend`.
    pub fn new(
        algorithm: BucketAlgorithm,
        backend: Arc<dyn AtomicBucketBackend>,
        options: DistributedBucketOptions,
    ) -> Self {
        Self {
            algorithm,
            config: options.bucket_config(),
            clock: options.clock,
            backend,
        }
    }

    /// Token bucket kept in `backend`.
    pub fn token_bucket(
        backend: Arc<dyn AtomicBucketBackend>,
        options: DistributedBucketOptions,
    ) -> Self {
        Self::new(BucketAlgorithm::TokenBucket, backend, options)
    }

    /// Leaky bucket kept in `backend`.
    pub fn leaky_bucket(
        backend: Arc<dyn AtomicBucketBackend>,
        options: DistributedBucketOptions,
    ) -> Self {
        Self::new(BucketAlgorithm::LeakyBucket, backend, options)
    }

    /// Algorithm applied by this limiter.
    pub fn algorithm(&self) -> BucketAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for DistributedBucketRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedBucketRateLimiter")
            .field("algorithm", &self.algorithm)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl RateLimiter for DistributedBucketRateLimiter {
    fn allow_request(&self, key: &str) -> Result<RateLimitResult, SluiceError> {
        validate_key(key)?;

        let result = self
            .backend
            .evaluate(self.algorithm, key, &self.config, self.clock.now())
            .inspect_err(|err| {
                tracing::warn!(
                    key,
                    algorithm = %self.algorithm,
                    error = %err,
                    "distributed.bucket.error, no decision made"
                );
            })?;

        tracing::trace!(
            key,
            algorithm = %self.algorithm,
            allowed = result.allowed,
            remaining = result.remaining,
            "distributed.bucket.decision"
        );

        Ok(result)
    }

    fn reset(&self, key: &str) -> Result<(), SluiceError> {
        validate_key(key)?;

        self.backend.delete(self.algorithm, key)?;
        tracing::debug!(key, algorithm = %self.algorithm, "distributed.bucket.reset");

        Ok(())
    }
}
