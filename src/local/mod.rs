//! In-process bucket storage.
//!
//! The local limiter keeps one [`BucketState`](crate::BucketState) per key in a
//! [`DashMap`](dashmap::DashMap). Every decision runs while holding the write
//! lock of the shard that owns the key, so two callers on the same key never
//! read the same pre-update state, while keys in other shards proceed in
//! parallel.
//!
//! # Key Characteristics
//!
//! - **Thread-safe:** Safe for concurrent use across multiple threads
//! - **No external dependencies:** No network or database required
//! - **Linearizable per key:** No interleaving admits more than the bucket holds
//! - **Process-scoped:** State is not shared across processes
//!
//! # When to Use
//!
//! ✅ **Use the local limiter when:**
//! - Single-process application
//! - Low-latency requirements
//! - No need for distributed coordination
//!
//! ❌ **Use [`DistributedBucketRateLimiter`](crate::DistributedBucketRateLimiter) when:**
//! - Multiple application instances need shared limits
//! - Limits must survive process restarts
//!
//! # Examples
//!
//! ```
//! use sluice::{Capacity, LocalBucketOptions, LocalBucketRateLimiter, Rate, RateLimiter};
//!
//! let options = LocalBucketOptions::new(
//!     Capacity::try_from(10.0).unwrap(),
//!     Rate::try_from(1.0).unwrap(),
//! );
//!
//! let tokens = LocalBucketRateLimiter::token_bucket(options.clone());
//! let leaky = LocalBucketRateLimiter::leaky_bucket(options);
//!
//! assert!(tokens.allow_request("user_123").unwrap().allowed);
//! assert!(leaky.allow_request("user_123").unwrap().allowed);
//! ```

mod local_bucket_options;
pub use local_bucket_options::*;

mod local_bucket_rate_limiter;
pub use local_bucket_rate_limiter::*;
