use dashmap::DashMap;

use crate::{
    AtomicBucketBackend, BucketAlgorithm, BucketConfig, BucketState, KeyTtlSeconds,
    RateLimitResult, SluiceError,
};

#[derive(Debug, Clone, Copy)]
struct StoredBucket {
    state: BucketState,
    expires_at: f64,
}

/// An [`AtomicBucketBackend`] held in this process's memory.
///
/// Limiters sharing one instance (through an `Arc`) see a single store, the
/// same way separate processes share one Redis. Useful for single-node
/// deployments and for exercising distributed limiters without a server.
///
/// Entries expire like Redis keys: lazily on access, or in bulk through
/// [`purge_expired`](Self::purge_expired).
#[derive(Debug, Default)]
pub struct InMemoryBucketBackend {
    key_ttl_seconds: KeyTtlSeconds,
    buckets: DashMap<String, StoredBucket>,
}

impl InMemoryBucketBackend {
    /// Backend with the default key TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose idle keys live at least `key_ttl_seconds`.
    pub fn with_key_ttl(key_ttl_seconds: KeyTtlSeconds) -> Self {
        Self {
            key_ttl_seconds,
            buckets: DashMap::new(),
        }
    }

    /// Number of stored keys, expired or not.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop every key that expired at or before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: f64) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, stored| stored.expires_at > now);
        before.saturating_sub(self.buckets.len())
    }
}

fn storage_key(algorithm: BucketAlgorithm, key: &str) -> String {
    format!("{}:{}", algorithm.key_tag(), key)
}

impl AtomicBucketBackend for InMemoryBucketBackend {
    fn evaluate(
        &self,
        algorithm: BucketAlgorithm,
        key: &str,
        config: &BucketConfig,
        now: f64,
    ) -> Result<RateLimitResult, SluiceError> {
        let expires_at = now + config.expiry_seconds(self.key_ttl_seconds) as f64;

        let mut stored = self
            .buckets
            .entry(storage_key(algorithm, key))
            .or_insert_with(|| StoredBucket {
                state: algorithm.initial_state(config, now),
                expires_at,
            });

        if stored.expires_at <= now {
            stored.state = algorithm.initial_state(config, now);
        }

        let (state, result) = algorithm.apply(config, stored.state, now);
        stored.state = state;
        stored.expires_at = expires_at;

        Ok(result)
    }

    fn delete(&self, algorithm: BucketAlgorithm, key: &str) -> Result<(), SluiceError> {
        self.buckets.remove(&storage_key(algorithm, key));
        Ok(())
    }
}
