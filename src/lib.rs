#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod rate_limiter;
pub use rate_limiter::*;

mod bucket;
pub use bucket::*;

mod clock;
pub use clock::*;

pub mod local;
pub use local::*;

pub mod distributed;
pub use distributed::*;

#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
pub mod redis;
#[cfg(feature = "redis")]
pub use self::redis::*;

mod error;
pub use error::*;

mod common;
pub use common::{BucketConfig, Capacity, KeyTtlSeconds, Rate, RateLimitResult};

#[cfg(test)]
mod tests;
