use redis::Script;

use crate::{
    AtomicBucketBackend, BucketAlgorithm, BucketConfig, KeyTtlSeconds, RateLimitResult,
    RedisKey, RedisKeyGenerator, SluiceError, SluiceRedisClient,
};

/// Configuration for [`RedisBucketBackend`].
///
/// # Examples
///
/// ```ignore
/// use sluice::{KeyTtlSeconds, RedisBucketBackendOptions, RedisKey, SluiceRedisClient};
///
/// let client = redis::Client::open("redis://127.0.0.1:6379/")?;
///
/// let options = RedisBucketBackendOptions {
///     client: SluiceRedisClient::from_client(client, 4)?,
///     prefix: Some(RedisKey::try_from("myapp".to_string())?), // Keys: myapp:tb:<key>
///     key_ttl_seconds: KeyTtlSeconds::default(),
/// };
/// ```
#[derive(Clone, Debug)]
pub struct RedisBucketBackendOptions {
    /// Connection pool.
    pub client: SluiceRedisClient,

    /// Optional prefix for all Redis keys.
    ///
    /// Keys are laid out as `<prefix>:tb:<key>` for token buckets and
    /// `<prefix>:lb:<key>` for leaky buckets. If `None`, defaults to `"sluice"`.
    pub prefix: Option<RedisKey>,

    /// Minimum expiry applied to every bucket on write.
    ///
    /// The effective TTL is never shorter than `capacity / rate`, so a key
    /// only expires once its bucket would have fully recovered anyway.
    pub key_ttl_seconds: KeyTtlSeconds,
}

/// [`AtomicBucketBackend`] running the bucket math inside Redis.
///
/// Each decision is one Lua script invocation (`EVALSHA`, falling back to
/// loading the script), which Redis executes without interleaving any other
/// command. Bucket state is a hash with two fields, `level` and `updated_at`.
///
/// # Requirements
///
/// - **Redis:** >= 4.0 (multi-field `HSET`)
pub struct RedisBucketBackend {
    client: SluiceRedisClient,
    key_generator: RedisKeyGenerator,
    key_ttl_seconds: KeyTtlSeconds,
    token_bucket_script: Script,
    leaky_bucket_script: Script,
}

const TOKEN_BUCKET_SCRIPT: &str = r#"
    local bucket_key = KEYS[1]

    local capacity = tonumber(ARGV[1])
    local rate = tonumber(ARGV[2])
    local now = tonumber(ARGV[3])
    local ttl_seconds = ARGV[4]

    local bucket = redis.call("HMGET", bucket_key, "level", "updated_at")
    local level = tonumber(bucket[1])
    local updated_at = tonumber(bucket[2])

    if level == nil or updated_at == nil then
        level = capacity
        updated_at = now
    end

    local elapsed = math.max(0, now - updated_at)
    level = math.max(0, math.min(capacity, level + elapsed * rate))
    updated_at = math.max(updated_at, now)

    local allowed = 0
    local remaining = 0
    local retry_after = "0"

    if level >= 1 then
        level = level - 1
        allowed = 1
        remaining = math.floor(level)
    elseif rate > 0 then
        retry_after = string.format("%.17g", (1 - level) / rate)
    else
        retry_after = "inf"
    end

    redis.call("HSET", bucket_key,
        "level", string.format("%.17g", level),
        "updated_at", string.format("%.17g", updated_at))

    redis.call("EXPIRE", bucket_key, ttl_seconds)

    return {allowed, remaining, retry_after}
"#;

const LEAKY_BUCKET_SCRIPT: &str = r#"
    local bucket_key = KEYS[1]

    local capacity = tonumber(ARGV[1])
    local rate = tonumber(ARGV[2])
    local now = tonumber(ARGV[3])
    local ttl_seconds = ARGV[4]

    local bucket = redis.call("HMGET", bucket_key, "level", "updated_at")
    local level = tonumber(bucket[1])
    local updated_at = tonumber(bucket[2])

    if level == nil or updated_at == nil then
        level = 0
        updated_at = now
    end

    local elapsed = math.max(0, now - updated_at)
    level = math.max(0, math.min(capacity, level - elapsed * rate))
    updated_at = math.max(updated_at, now)

    local allowed = 0
    local remaining = 0
    local retry_after = "0"

    if level < capacity then
        level = math.min(capacity, level + 1)
        allowed = 1
        remaining = math.floor(capacity - level)
    elseif rate > 0 then
        retry_after = string.format("%.17g", 1 / rate)
    else
        retry_after = "inf"
    end

    redis.call("HSET", bucket_key,
        "level", string.format("%.17g", level),
        "updated_at", string.format("%.17g", updated_at))

    redis.call("EXPIRE", bucket_key, ttl_seconds)

    return {allowed, remaining, retry_after}
"#;

impl RedisBucketBackend {
    /// Create a backend. Does not touch the network.
    pub fn new(options: RedisBucketBackendOptions) -> Self {
        let prefix = options.prefix.unwrap_or_else(RedisKey::default_prefix);

        Self {
            client: options.client,
            key_generator: RedisKeyGenerator::new(prefix),
            key_ttl_seconds: options.key_ttl_seconds,
            token_bucket_script: Script::new(TOKEN_BUCKET_SCRIPT),
            leaky_bucket_script: Script::new(LEAKY_BUCKET_SCRIPT),
        }
    }

    fn script(&self, algorithm: BucketAlgorithm) -> &Script {
        match algorithm {
            BucketAlgorithm::TokenBucket => &self.token_bucket_script,
            BucketAlgorithm::LeakyBucket => &self.leaky_bucket_script,
        }
    }
}

impl std::fmt::Debug for RedisBucketBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBucketBackend")
            .field("client", &self.client)
            .field("key_generator", &self.key_generator)
            .field("key_ttl_seconds", &self.key_ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl AtomicBucketBackend for RedisBucketBackend {
    fn evaluate(
        &self,
        algorithm: BucketAlgorithm,
        key: &str,
        config: &BucketConfig,
        now: f64,
    ) -> Result<RateLimitResult, SluiceError> {
        let bucket_key = self.key_generator.get_bucket_key(algorithm, key);
        let script = self.script(algorithm);

        let (allowed, remaining, retry_after): (i64, u64, String) =
            self.client.with_connection(|conn| {
                script
                    .key(&bucket_key)
                    .arg(*config.capacity)
                    .arg(*config.rate)
                    .arg(now)
                    .arg(config.expiry_seconds(self.key_ttl_seconds))
                    .invoke(conn)
            })?;

        match allowed {
            1 => Ok(RateLimitResult::allowed(remaining)),
            0 => {
                let retry_after = retry_after.parse::<f64>().map_err(|_| {
                    SluiceError::InvalidBackendReply(format!(
                        "retry_after is not a number: {retry_after}"
                    ))
                })?;

                Ok(RateLimitResult::rejected(retry_after))
            }
            other => Err(SluiceError::InvalidBackendReply(format!(
                "unexpected admission flag from Redis script: {other}"
            ))),
        }
    } // end method evaluate

    fn delete(&self, algorithm: BucketAlgorithm, key: &str) -> Result<(), SluiceError> {
        let bucket_key = self.key_generator.get_bucket_key(algorithm, key);

        self.client
            .with_connection(|conn| redis::cmd("DEL").arg(&bucket_key).query::<()>(conn))
    }
}
