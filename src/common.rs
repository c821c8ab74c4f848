use std::{ops::Deref, time::Duration};

use crate::SluiceError;

/// Maximum accepted key length, in bytes.
pub(crate) const MAX_KEY_LEN: usize = 255;

/// Longest expiry ever written to a shared store: 100 years.
pub(crate) const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 3600;

/// Bucket size: the most requests a key may burst through at once.
///
/// Must be finite and greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Capacity(f64);

impl Deref for Capacity {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<f64> for Capacity {
    type Error = SluiceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0f64 {
            Err(SluiceError::InvalidConfiguration(
                "capacity must be a finite number greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

impl TryFrom<u64> for Capacity {
    type Error = SluiceError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::try_from(value as f64)
    }
}

/// Units per second: refill rate for token buckets, leak rate for leaky buckets.
///
/// Values built through [`TryFrom`] are finite and greater than zero. A bucket
/// that never replenishes has to be asked for explicitly with
/// [`Rate::non_replenishing`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rate(f64);

impl Rate {
    /// A rate of zero. Buckets using it hold a fixed budget that only
    /// [`reset`](crate::RateLimiter::reset) restores, and report an infinite
    /// `retry_after` once exhausted.
    pub const fn non_replenishing() -> Self {
        Self(0f64)
    }

    /// Whether this rate ever replenishes the bucket.
    pub fn is_replenishing(&self) -> bool {
        self.0 > 0f64
    }

    /// Seconds needed to move `units` at this rate, `+inf` for a zero rate.
    pub(crate) fn seconds_for(&self, units: f64) -> f64 {
        if self.is_replenishing() {
            units / self.0
        } else {
            f64::INFINITY
        }
    }
}

impl Deref for Rate {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<f64> for Rate {
    type Error = SluiceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0f64 {
            Err(SluiceError::InvalidConfiguration(
                "rate must be a finite number greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Lower bound on how long an idle key is kept in a shared store.
///
/// The effective expiry is never shorter than the time the bucket needs to
/// fully recover, so expiring a key never loosens a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyTtlSeconds(u64);

impl Default for KeyTtlSeconds {
    fn default() -> Self {
        Self(3600)
    }
}

impl Deref for KeyTtlSeconds {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u64> for KeyTtlSeconds {
    type Error = SluiceError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value < 1 {
            Err(SluiceError::InvalidConfiguration(
                "key ttl must be at least 1 second".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Immutable bucket parameters shared by every key of a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketConfig {
    /// Bucket size.
    pub capacity: Capacity,
    /// Refill or leak rate per second.
    pub rate: Rate,
}

impl BucketConfig {
    /// Seconds an idle bucket needs to return to its fresh state.
    pub(crate) fn recovery_seconds(&self) -> f64 {
        self.rate.seconds_for(*self.capacity)
    }

    /// Whole seconds a shared store keeps an idle bucket: `key_ttl_seconds`, or
    /// the recovery time if longer, capped at [`MAX_TTL_SECONDS`].
    pub(crate) fn expiry_seconds(&self, key_ttl_seconds: KeyTtlSeconds) -> u64 {
        let recovery = self.recovery_seconds();
        let floor = (*key_ttl_seconds).min(MAX_TTL_SECONDS);

        if recovery.is_finite() {
            (recovery.ceil().min(MAX_TTL_SECONDS as f64) as u64).max(floor)
        } else {
            floor
        }
    }
}

/// Outcome of a single admission check. Never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitResult {
    /// Whether the request was admitted.
    pub allowed: bool,
    /// Whole units still available to this key after the decision.
    pub remaining: u64,
    /// Seconds until one more unit becomes available. Only set on rejection;
    /// `+inf` when the bucket never replenishes.
    pub retry_after: Option<f64>,
}

impl RateLimitResult {
    pub(crate) fn allowed(remaining: u64) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after: None,
        }
    }

    pub(crate) fn rejected(retry_after: f64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after: Some(retry_after),
        }
    }

    /// `retry_after` as a [`Duration`], saturating to [`Duration::MAX`] for
    /// buckets that never replenish.
    pub fn retry_after_duration(&self) -> Option<Duration> {
        self.retry_after
            .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    }
}

/// Reject keys that must never reach a store.
pub(crate) fn validate_key(key: &str) -> Result<(), SluiceError> {
    if key.is_empty() {
        Err(SluiceError::InvalidKey("key must not be empty".to_string()))
    } else if key.len() > MAX_KEY_LEN {
        Err(SluiceError::InvalidKey(format!(
            "key must not be longer than {MAX_KEY_LEN} bytes"
        )))
    } else if key.chars().any(|c| c.is_ascii_control()) {
        Err(SluiceError::InvalidKey(
            "key must not contain control characters".to_string(),
        ))
    } else {
        Ok(())
    }
}
