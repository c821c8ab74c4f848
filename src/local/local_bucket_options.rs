use std::sync::Arc;

use crate::{BucketConfig, Capacity, Clock, MonotonicClock, Rate};

/// Configuration for [`LocalBucketRateLimiter`](crate::LocalBucketRateLimiter).
#[derive(Clone, Debug)]
pub struct LocalBucketOptions {
    /// Bucket size.
    pub capacity: Capacity,
    /// Refill rate (token bucket) or leak rate (leaky bucket), per second.
    pub rate: Rate,
    /// Time source. Defaults to a [`MonotonicClock`].
    pub clock: Arc<dyn Clock>,
}

impl LocalBucketOptions {
    /// Options with a fresh [`MonotonicClock`].
    pub fn new(capacity: Capacity, rate: Rate) -> Self {
        Self {
            capacity,
            rate,
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn bucket_config(&self) -> BucketConfig {
        BucketConfig {
            capacity: self.capacity,
            rate: self.rate,
        }
    }
}
