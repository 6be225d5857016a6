use proptest::prelude::*;
use std::time::Duration;
use tollgate::{ManualClock, TokenBucket};

const EPSILON: f64 = 1e-6;

fn create_bucket(capacity: u64, fill_rate: f64) -> (TokenBucket<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let bucket = TokenBucket::with_clock(capacity, fill_rate, clock.clone()).unwrap();
    (bucket, clock)
}

/// A step of a request sequence: wait, then ask for some tokens.
fn step() -> impl Strategy<Value = (u64, u64)> {
    (0u64..5_000, 1u64..20)
}

// Balance stays within [0, capacity] and every decision is exact
proptest! {
    #[test]
    fn balance_stays_in_bounds(
        capacity in 1u64..50,
        fill_rate in 0.0f64..20.0,
        steps in prop::collection::vec(step(), 1..100),
    ) {
        let (bucket, clock) = create_bucket(capacity, fill_rate);

        for (wait_ms, cost) in steps {
            clock.advance(Duration::from_millis(wait_ms));

            // The clock is frozen, so this is exactly what `allow` will see
            let before = bucket.available();
            let admitted = bucket.allow(cost).unwrap();
            let after = bucket.available();

            prop_assert!(after >= 0.0);
            prop_assert!(after <= capacity as f64);

            if admitted {
                prop_assert!(before >= cost as f64);
                prop_assert!((after - (before - cost as f64)).abs() < EPSILON);
            } else {
                prop_assert!(before < cost as f64);
                prop_assert_eq!(after, before);
            }
        }
    }
}

// Without consumption the balance grows linearly up to capacity
proptest! {
    #[test]
    fn refill_is_linear_and_capped(
        capacity in 1u64..100,
        fill_rate in 0.0f64..10.0,
        spend in 0u64..100,
        wait_ms in 0u64..60_000,
    ) {
        let (bucket, clock) = create_bucket(capacity, fill_rate);
        let spend = spend.min(capacity);
        if spend > 0 {
            prop_assert!(bucket.allow(spend).unwrap());
        }

        let before = bucket.available();
        clock.advance(Duration::from_millis(wait_ms));
        let after = bucket.available();

        let expected = (before + wait_ms as f64 / 1000.0 * fill_rate).min(capacity as f64);
        prop_assert!((after - expected).abs() < EPSILON, "expected {}, got {}", expected, after);
    }
}

// Back-to-back calls share one refill
proptest! {
    #[test]
    fn no_double_refill(
        capacity in 1u64..50,
        fill_rate in 0.0f64..20.0,
        drain in 1u64..50,
        wait_ms in 0u64..10_000,
        cost in 1u64..50,
    ) {
        let (bucket, clock) = create_bucket(capacity, fill_rate);
        let drain = drain.min(capacity);
        prop_assert!(bucket.allow(drain).unwrap());

        clock.advance(Duration::from_millis(wait_ms));
        let refilled = bucket.available();
        let first = bucket.allow(cost).unwrap();
        let second = bucket.allow(cost).unwrap();

        let spent = (first as u64 + second as u64) * cost;
        prop_assert!(spent as f64 <= refilled + EPSILON);
        prop_assert!((bucket.available() - (refilled - spent as f64)).abs() < EPSILON);
    }
}

#[test]
fn shared_bucket_across_threads() {
    let (bucket, clock) = create_bucket(40, 10.0);
    let bucket = std::sync::Arc::new(bucket);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let bucket = std::sync::Arc::clone(&bucket);
            std::thread::spawn(move || (0..20).filter(|_| bucket.allow(1).unwrap()).count())
        })
        .collect();
    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    // The clock never moved, so only the initial 40 tokens were available
    assert_eq!(admitted, 40);
    assert_eq!(bucket.available(), 0.0);

    clock.advance(Duration::from_secs(1));
    assert_eq!(bucket.available(), 10.0);
}
