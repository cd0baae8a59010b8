// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[test]
fn twelve_levels_in_priority_order() {
    assert!(DebugLevel::Fail < DebugLevel::Crit);
    assert!(DebugLevel::Conf < DebugLevel::All);
    assert_eq!(DebugLevel::Fail.index(), 0);
    assert_eq!(DebugLevel::All.index(), 11);
}

#[parameterized(
    below = { -5, DebugLevel::Fail },
    exact = { 4, DebugLevel::Conf },
    above = { 99, DebugLevel::All },
)]
fn from_index_saturates(n: i64, expected: DebugLevel) {
    assert_eq!(DebugLevel::from_index(n), expected);
}

#[test]
fn clamp_band_bounds_both_sides() {
    assert_eq!(DebugLevel::Fail.clamp_band(DebugLevel::Conf, DebugLevel::All), DebugLevel::Conf);
    assert_eq!(DebugLevel::Note.clamp_band(DebugLevel::Conf, DebugLevel::All), DebugLevel::Note);
    assert_eq!(DebugLevel::All.clamp_band(DebugLevel::Fail, DebugLevel::Info), DebugLevel::Info);
}

#[test]
fn parse_round_trips_names() {
    for level in [
        DebugLevel::Fail,
        DebugLevel::Test,
        DebugLevel::Crit,
        DebugLevel::GoOn,
        DebugLevel::Conf,
        DebugLevel::Stub,
        DebugLevel::Warn,
        DebugLevel::Mild,
        DebugLevel::Note,
        DebugLevel::Call,
        DebugLevel::Info,
        DebugLevel::All,
    ] {
        assert_eq!(DebugLevel::parse(&level.to_string()), Some(level));
    }
    assert_eq!(DebugLevel::parse("bogus"), None);
}

#[test]
fn emit_does_not_panic_on_any_level() {
    for n in 0..=11 {
        emit(DebugLevel::from_index(n), "test", Some("t-1"), "line");
    }
}
