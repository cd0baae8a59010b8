// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
    assert!(clock.epoch_ms() > 0);
}

#[test]
fn fake_clock_is_frozen_until_advanced() {
    let clock = FakeClock::new(1_000);
    let a = clock.now();
    assert_eq!(clock.epoch_ms(), 1_000);
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), 1_250);
    assert_eq!(clock.now() - a, Duration::from_millis(250));
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new(0);
    let other = clock.clone();
    clock.advance(Duration::from_secs(1));
    assert_eq!(other.epoch_ms(), 1_000);
    other.set_epoch_ms(5_000);
    assert_eq!(clock.epoch_ms(), 5_000);
}

#[test]
fn age_of_saturates_for_future_stamps() {
    let clock = FakeClock::new(2_000);
    assert_eq!(clock.age_of(1_500), 500);
    assert_eq!(clock.age_of(9_000), 0);
}

#[test]
fn now_msec_is_epoch_scaled() {
    // A very loose sanity bound: after 2020, before 2100.
    let ms = now_msec();
    assert!(ms > 1_577_836_800_000);
    assert!(ms < 4_102_444_800_000);
}
