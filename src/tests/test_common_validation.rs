use std::time::Duration;

use crate::{
    BucketConfig, Capacity, KeyTtlSeconds, Rate, RateLimitResult, SluiceError,
    common::{MAX_TTL_SECONDS, validate_key},
};

#[test]
fn capacity_try_from_validates_positive() {
    let c = Capacity::try_from(1f64).unwrap();
    assert_eq!(*c, 1f64);

    let c = Capacity::try_from(5u64).unwrap();
    assert_eq!(*c, 5f64);

    assert_eq!(
        Capacity::try_from(0f64).unwrap_err(),
        SluiceError::InvalidConfiguration(
            "capacity must be a finite number greater than 0".to_string()
        )
    );
    assert!(Capacity::try_from(-1f64).is_err());
    assert!(Capacity::try_from(0u64).is_err());
    assert!(Capacity::try_from(f64::NAN).is_err());
    assert!(Capacity::try_from(f64::INFINITY).is_err());
}

#[test]
fn rate_try_from_validates_positive() {
    let r = Rate::try_from(0.5f64).unwrap();
    assert_eq!(*r, 0.5f64);
    assert!(r.is_replenishing());

    assert_eq!(
        Rate::try_from(0f64).unwrap_err(),
        SluiceError::InvalidConfiguration("rate must be a finite number greater than 0".to_string())
    );
    assert!(Rate::try_from(-1f64).is_err());
    assert!(Rate::try_from(f64::NAN).is_err());
    assert!(Rate::try_from(f64::INFINITY).is_err());
}

#[test]
fn non_replenishing_rate_is_explicit_zero() {
    let r = Rate::non_replenishing();
    assert_eq!(*r, 0f64);
    assert!(!r.is_replenishing());
    assert_eq!(r.seconds_for(1f64), f64::INFINITY);
}

#[test]
fn key_ttl_seconds_default_and_try_from_validate_min_1() {
    assert_eq!(*KeyTtlSeconds::default(), 3600);
    assert_eq!(*KeyTtlSeconds::try_from(1u64).unwrap(), 1);

    assert_eq!(
        KeyTtlSeconds::try_from(0u64).unwrap_err(),
        SluiceError::InvalidConfiguration("key ttl must be at least 1 second".to_string())
    );
}

#[test]
fn validate_key_rejects_empty_long_and_control_characters() {
    assert!(validate_key("user_123").is_ok());
    assert!(validate_key("tenant:user 42").is_ok());
    assert!(validate_key(&"k".repeat(255)).is_ok());

    assert!(matches!(validate_key(""), Err(SluiceError::InvalidKey(_))));
    assert!(matches!(
        validate_key(&"k".repeat(256)),
        Err(SluiceError::InvalidKey(_))
    ));
    assert!(matches!(
        validate_key("line\nbreak"),
        Err(SluiceError::InvalidKey(_))
    ));
}

#[test]
fn retry_after_duration_saturates_for_infinite_waits() {
    assert_eq!(RateLimitResult::allowed(3).retry_after_duration(), None);

    assert_eq!(
        RateLimitResult::rejected(1.5).retry_after_duration(),
        Some(Duration::from_millis(1500))
    );

    assert_eq!(
        RateLimitResult::rejected(f64::INFINITY).retry_after_duration(),
        Some(Duration::MAX)
    );
}

#[test]
fn expiry_covers_recovery_and_stays_within_bounds() {
    let ttl = KeyTtlSeconds::try_from(30u64).unwrap();
    let config = |capacity: f64, rate: Rate| BucketConfig {
        capacity: Capacity::try_from(capacity).unwrap(),
        rate,
    };

    assert_eq!(config(10.0, Rate::try_from(1.0).unwrap()).expiry_seconds(ttl), 30);
    assert_eq!(config(100.0, Rate::try_from(1.0).unwrap()).expiry_seconds(ttl), 100);
    assert_eq!(config(10.0, Rate::try_from(3.0).unwrap()).expiry_seconds(ttl), 30);
    assert_eq!(config(1.0, Rate::non_replenishing()).expiry_seconds(ttl), 30);

    // Recovery times far beyond anything Redis should store are capped.
    let slow = config(1e15, Rate::try_from(1e-3).unwrap());
    assert_eq!(slow.expiry_seconds(ttl), MAX_TTL_SECONDS);

    let huge_ttl = KeyTtlSeconds::try_from(u64::MAX).unwrap();
    assert_eq!(
        config(1.0, Rate::non_replenishing()).expiry_seconds(huge_ttl),
        MAX_TTL_SECONDS
    );
}
