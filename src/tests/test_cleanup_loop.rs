use std::{sync::Arc, thread, time::Duration};

use crate::{
    BucketAlgorithm, Capacity, LocalBucketOptions, LocalBucketRateLimiter, ManualClock, Rate,
    RateLimiter,
};

fn limiter(algorithm: BucketAlgorithm) -> (Arc<LocalBucketRateLimiter>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0.0));
    let options = LocalBucketOptions::new(
        Capacity::try_from(2.0).unwrap(),
        Rate::try_from(1.0).unwrap(),
    )
    .with_clock(clock.clone());

    (
        Arc::new(LocalBucketRateLimiter::new(algorithm, options)),
        clock,
    )
}

#[test]
fn cleanup_removes_only_recovered_buckets() {
    for algorithm in [BucketAlgorithm::TokenBucket, BucketAlgorithm::LeakyBucket] {
        let (limiter, clock) = limiter(algorithm);

        limiter.allow_request("idle").unwrap();
        clock.advance(1.5);
        limiter.allow_request("busy").unwrap();
        limiter.allow_request("busy").unwrap();

        // "idle" needed 1s to recover; "busy" needs 2s.
        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.buckets().contains_key("busy"));

        clock.advance(2.0);
        assert_eq!(limiter.cleanup(), 1);
        assert!(limiter.is_empty());
    }
}

#[test]
fn cleanup_is_invisible_to_callers() {
    let (limiter, clock) = limiter(BucketAlgorithm::TokenBucket);

    limiter.allow_request("k").unwrap();
    clock.advance(1.0);

    let (twin, twin_clock) = self::limiter(BucketAlgorithm::TokenBucket);
    twin.allow_request("k").unwrap();
    twin_clock.advance(1.0);

    assert_eq!(limiter.cleanup(), 1);

    for _ in 0..3 {
        assert_eq!(
            limiter.allow_request("k").unwrap(),
            twin.allow_request("k").unwrap()
        );
    }
}

#[test]
fn fixed_budget_buckets_are_never_cleaned_up() {
    let limiter = LocalBucketRateLimiter::token_bucket(LocalBucketOptions::new(
        Capacity::try_from(2.0).unwrap(),
        Rate::non_replenishing(),
    ));

    limiter.allow_request("k").unwrap();
    assert_eq!(limiter.cleanup(), 0);
    assert_eq!(limiter.len(), 1);
}

#[test]
fn cleanup_loop_runs() {
    let (limiter, clock) = limiter(BucketAlgorithm::TokenBucket);

    limiter.allow_request("key1").unwrap();
    limiter.allow_request("key2").unwrap();
    limiter.allow_request("key3").unwrap();
    assert_eq!(limiter.len(), 3);

    clock.advance(10.0);
    limiter.run_cleanup_loop(Duration::from_millis(20));

    thread::sleep(Duration::from_millis(200));
    assert!(limiter.is_empty());

    limiter.stop_cleanup_loop();
}

#[test]
fn cleanup_loop_keeps_active_entries() {
    let (limiter, clock) = limiter(BucketAlgorithm::LeakyBucket);

    limiter.allow_request("key1").unwrap();
    limiter.run_cleanup_loop(Duration::from_millis(10));

    for _ in 0..5 {
        thread::sleep(Duration::from_millis(20));
        clock.advance(0.5);
        limiter.allow_request("key1").unwrap();
    }

    assert_eq!(limiter.len(), 1);
    limiter.stop_cleanup_loop();
}

#[test]
fn stop_cleanup_loop_prevents_future_cleanup() {
    let (limiter, clock) = limiter(BucketAlgorithm::TokenBucket);

    limiter.allow_request("key1").unwrap();
    limiter.run_cleanup_loop(Duration::from_millis(20));
    thread::sleep(Duration::from_millis(10));

    // Idempotent stop
    limiter.stop_cleanup_loop();
    limiter.stop_cleanup_loop();

    clock.advance(10.0);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(limiter.len(), 1);
}

#[test]
fn run_cleanup_loop_twice_is_a_no_op_and_restart_works() {
    let (limiter, clock) = limiter(BucketAlgorithm::TokenBucket);
    limiter.allow_request("key1").unwrap();

    limiter.run_cleanup_loop(Duration::from_millis(20));
    limiter.run_cleanup_loop(Duration::from_millis(20));
    thread::sleep(Duration::from_millis(10));
    limiter.stop_cleanup_loop();

    // A second loop would still be running and would remove the key.
    clock.advance(10.0);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(limiter.len(), 1);

    limiter.run_cleanup_loop(Duration::from_millis(20));
    thread::sleep(Duration::from_millis(100));
    assert!(limiter.is_empty());
    limiter.stop_cleanup_loop();
}

#[test]
fn cleanup_loop_exits_when_limiter_is_dropped() {
    let (limiter, _clock) = limiter(BucketAlgorithm::TokenBucket);
    let weak = Arc::downgrade(&limiter);

    let handle = limiter
        .run_cleanup_loop(Duration::from_millis(10))
        .expect("cleanup loop should start");
    assert!(!handle.is_finished());

    drop(limiter);

    thread::sleep(Duration::from_millis(100));
    assert!(weak.upgrade().is_none());
    assert!(handle.is_finished());
    handle.join().expect("cleanup thread panicked");
}

#[test]
fn cleanup_loop_exits_when_stopped() {
    let (limiter, _clock) = limiter(BucketAlgorithm::TokenBucket);

    let handle = limiter
        .run_cleanup_loop(Duration::from_millis(10))
        .expect("cleanup loop should start");
    assert!(limiter.run_cleanup_loop(Duration::from_millis(10)).is_none());

    limiter.stop_cleanup_loop();

    thread::sleep(Duration::from_millis(100));
    assert!(handle.is_finished());
    assert_eq!(Arc::strong_count(&limiter), 1);
}
