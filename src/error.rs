/// Error type for this crate.
///
/// A rejected request is not an error: it is a [`RateLimitResult`](crate::RateLimitResult)
/// with `allowed == false`. Errors mean no decision could be made.
///
/// Backend failures are surfaced as-is. The crate never converts them into an
/// allow or deny decision; whether to fail open or closed is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SluiceError {
    /// A capacity, rate or TTL failed validation at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller key was empty or malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The shared store could not be reached or the atomic script failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// The shared store answered with something that is not a bucket decision.
    #[error("invalid backend reply: {0}")]
    InvalidBackendReply(String),

    /// A Redis client was requested with zero connections.
    #[error("invalid redis connection count: {0}")]
    InvalidConnectionCount(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for SluiceError {
    fn from(err: redis::RedisError) -> Self {
        SluiceError::Backend(err.to_string())
    }
}
