use std::sync::Arc;

use crate::{BucketConfig, Capacity, Clock, Rate, SystemClock};

/// Configuration for [`DistributedBucketRateLimiter`](crate::DistributedBucketRateLimiter).
///
/// Every process sharing a key must use the same capacity, rate and time base.
#[derive(Clone, Debug)]
pub struct DistributedBucketOptions {
    /// Bucket size.
    pub capacity: Capacity,
    /// Refill rate (token bucket) or leak rate (leaky bucket), per second.
    pub rate: Rate,
    /// Time source passed to the backend with every decision.
    /// Defaults to [`SystemClock`] so readings agree across processes.
    pub clock: Arc<dyn Clock>,
}

impl DistributedBucketOptions {
    /// Options using the wall clock.
    pub fn new(capacity: Capacity, rate: Rate) -> Self {
        Self {
            capacity,
            rate,
            clock: Arc::new(SystemClock),
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
