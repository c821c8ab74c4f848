use std::{
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;
use redis::{Client, Connection, RedisResult};

use crate::{BucketAlgorithm, SluiceError};

/// A round-robin pool of blocking [`redis::Connection`]s.
///
/// Each slot is used by one caller at a time. A slot whose connection breaks is
/// emptied and reconnected on its next use, so a Redis restart costs the
/// in-flight calls an error but does not poison the pool.
pub struct SluiceRedisClient {
    client: Client,
    connections: Arc<Vec<Mutex<Option<Connection>>>>,
    track_index: AtomicUsize,
}

impl std::fmt::Debug for SluiceRedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SluiceRedisClient")
            .field("client", &self.client)
            .field("connection_count", &self.connections.len())
            .field("track_index", &self.track_index)
            .finish_non_exhaustive()
    }
}

impl SluiceRedisClient {
    /// Create a pool with a single connection.
    pub fn default_from_client(client: Client) -> Result<Self, SluiceError> {
        Self::from_client(client, 1)
    }

    /// Create a pool of `connection_count` connections, all opened up front.
    ///
    /// Fails if any connection cannot be opened, which makes this the place
    /// for a composition root to check that Redis is reachable.
    pub fn from_client(client: Client, connection_count: usize) -> Result<Self, SluiceError> {
        if connection_count == 0 {
            return Err(SluiceError::InvalidConnectionCount(
                "connection count must be > 0".to_string(),
            ));
        }

        let mut connections = Vec::with_capacity(connection_count);

        for _ in 0..connection_count {
            connections.push(Mutex::new(Some(client.get_connection()?)));
        }

        Ok(Self {
            client,
            connections: Arc::new(connections),
            track_index: AtomicUsize::new(0),
        })
    }

    /// Round-trip a `PING` through the pool.
    pub fn ping(&self) -> Result<(), SluiceError> {
        self.with_connection(|conn| redis::cmd("PING").query::<String>(conn))
            .map(|_| ())
    }

    /// Run `f` on the next connection in the pool.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> Result<T, SluiceError> {
        let index = self.track_index.fetch_add(1, Ordering::Relaxed);
        let mut slot = self.connections[index % self.connections.len()].lock();

        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.client.get_connection()?,
        };

        match f(&mut conn) {
            Ok(value) => {
                *slot = Some(conn);
                Ok(value)
            }
            Err(err) => {
                if err.is_io_error() || err.is_connection_dropped() || err.is_unrecoverable_error()
                {
                    tracing::warn!(error = %err, "redis.connection.error, dropping connection");
                } else {
                    *slot = Some(conn);
                }

                Err(err.into())
            }
        }
    } // end method with_connection
} // end impl SluiceRedisClient

impl Clone for SluiceRedisClient {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            connections: self.connections.clone(),
            track_index: AtomicUsize::new(0),
        }
    }
}

/// A validated newtype for the Redis key prefix.
///
/// This is a string with the following constraints:
/// - Must not be empty
/// - Must not be longer than 255 bytes
/// - Must not contain colons
#[derive(Debug, Clone, PartialEq, PartialOrd, Hash, Eq)]
pub struct RedisKey(Arc<str>);

impl RedisKey {
    /// The prefix used when none is configured.
    pub fn default_prefix() -> Self {
        Self(Arc::from("sluice"))
    }
}

impl Deref for RedisKey {
    type Target = Arc<str>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<String> for RedisKey {
    type Error = SluiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(SluiceError::InvalidConfiguration(
                "Redis key must not be empty".to_string(),
            ))
        } else if value.len() > 255 {
            Err(SluiceError::InvalidConfiguration(
                "Redis key must not be longer than 255 characters".to_string(),
            ))
        } else if value.contains(':') {
            Err(SluiceError::InvalidConfiguration(
                "Redis key must not contain colons".to_string(),
            ))
        } else {
            Ok(Self(Arc::from(value)))
        }
    }
}

/// Builds `<prefix>:<tag>:<key>` names, one per algorithm and caller key.
#[derive(Clone, Debug)]
pub(crate) struct RedisKeyGenerator {
    pub prefix: RedisKey,
}

impl RedisKeyGenerator {
    pub(crate) fn new(prefix: RedisKey) -> Self {
        Self { prefix }
    }

    pub(crate) fn get_bucket_key(&self, algorithm: BucketAlgorithm, key: &str) -> String {
        format!("{}:{}:{}", *self.prefix, algorithm.key_tag(), key)
    }
}
