//! Redis-backed storage for distributed limiters (feature `redis`).
//!
//! [`RedisBucketBackend`] plugs into
//! [`DistributedBucketRateLimiter`](crate::DistributedBucketRateLimiter). All
//! bucket math runs inside Redis as Lua scripts, so processes sharing a Redis
//! instance share each key's budget exactly.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sluice::redis::{RedisBucketBackend, RedisBucketBackendOptions, SluiceRedisClient};
//! use sluice::{Capacity, DistributedBucketOptions, DistributedBucketRateLimiter, KeyTtlSeconds, Rate, RateLimiter};
//!
//! let client = SluiceRedisClient::from_client(redis::Client::open("redis://127.0.0.1:6379/")?, 4)?;
//! client.ping()?;
//!
//! let backend = Arc::new(RedisBucketBackend::new(RedisBucketBackendOptions {
//!     client,
//!     prefix: None,
//!     key_ttl_seconds: KeyTtlSeconds::default(),
//! }));
//!
//! let limiter = DistributedBucketRateLimiter::token_bucket(
//!     backend,
//!     DistributedBucketOptions::new(Capacity::try_from(100.0)?, Rate::try_from(10.0)?),
//! );
//!
//! match limiter.allow_request("user_123") {
//!     Ok(result) if result.allowed => { /* proceed */ }
//!     Ok(result) => { /* send 429, retry after result.retry_after */ }
//!     Err(err) => { /* backend down: fail open or closed, caller's choice */ }
//! }
//! ```

mod common;
pub use common::*;

mod redis_bucket_backend;
pub use redis_bucket_backend::*;
