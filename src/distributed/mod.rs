//! Bucket storage shared between processes.
//!
//! A [`DistributedBucketRateLimiter`] holds no lock and no state. Each decision
//! is delegated as one indivisible unit to an [`AtomicBucketBackend`], which
//! loads or creates the bucket, refills or leaks it, decides, and writes it
//! back with an expiry. Any store able to run that sequence atomically can
//! implement the backend; this crate ships
//! [`RedisBucketBackend`](crate::redis::RedisBucketBackend) (feature `redis`)
//! and [`InMemoryBucketBackend`].
//!
//! # Consistency Semantics
//!
//! - **Atomic decisions:** no two processes can both consume the last unit
//! - **All-or-nothing:** a failed call commits nothing
//! - **Errors are not decisions:** backend failures surface as
//!   [`SluiceError::Backend`](crate::SluiceError::Backend); the caller picks
//!   fail-open or fail-closed
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use sluice::{
//!     Capacity, DistributedBucketOptions, DistributedBucketRateLimiter, InMemoryBucketBackend,
//!     Rate, RateLimiter,
//! };
//!
//! let backend = Arc::new(InMemoryBucketBackend::new());
//! let options = DistributedBucketOptions::new(
//!     Capacity::try_from(1.0).unwrap(),
//!     Rate::try_from(0.5).unwrap(),
//! );
//!
//! // Two "processes" sharing one store.
//! let a = DistributedBucketRateLimiter::token_bucket(backend.clone(), options.clone());
//! let b = DistributedBucketRateLimiter::token_bucket(backend, options);
//!
//! assert!(a.allow_request("user_123").unwrap().allowed);
//! assert!(!b.allow_request("user_123").unwrap().allowed);
//! ```

mod backend;
pub use backend::*;

mod distributed_bucket_options;
pub use distributed_bucket_options::*;

mod distributed_bucket_rate_limiter;
pub use distributed_bucket_rate_limiter::*;

mod in_memory_backend;
pub use in_memory_backend::*;
