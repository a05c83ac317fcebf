// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::*;

#[yare::parameterized(
    first = { 0, 1000 },
    second = { 1, 1500 },
    third = { 2, 2250 },
    fifth = { 4, 5062 },
    ninth = { 8, 25628 },
    capped = { 9, 30000 },
    far = { 100, 30000 },
    max = { u32::MAX, 30000 },
)]
fn default_delays(attempts: u32, expected_ms: u128) {
    assert_eq!(ReconnectPolicy::default().delay(attempts).as_millis(), expected_ms);
}

#[test]
fn exhausted_at_max_attempts() {
    let policy = ReconnectPolicy::default();
    assert!(!policy.exhausted(9));
    assert!(policy.exhausted(10));
    assert!(policy.exhausted(11));
}

#[test]
fn shrinking_factor_is_treated_as_constant() {
    let policy = ReconnectPolicy { factor: 0.5, ..ReconnectPolicy::default() };
    assert_eq!(policy.delay(3), Duration::from_millis(1000));
}

proptest! {
    #[test]
    fn delay_is_monotonic_and_capped(attempts in 0u32..10_000) {
        let policy = ReconnectPolicy::default();
        let here = policy.delay(attempts);
        let next = policy.delay(attempts + 1);
        prop_assert!(here <= next);
        prop_assert!(next <= Duration::from_millis(30_000));
    }

    #[test]
    fn custom_policy_never_exceeds_cap(
        interval_ms in 1u64..5_000,
        cap_ms in 1u64..120_000,
        attempts in 0u32..64,
    ) {
        let policy = ReconnectPolicy {
            interval: Duration::from_millis(interval_ms),
            max_delay: Duration::from_millis(cap_ms),
            ..ReconnectPolicy::default()
        };
        prop_assert!(policy.delay(attempts) <= Duration::from_millis(cap_ms));
    }
}
