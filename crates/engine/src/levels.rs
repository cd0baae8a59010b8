// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's debug-level ladder.
//!
//! Twelve levels, highest priority first. Script-visible logging goes
//! through [`emit`], which folds the ladder onto the host tracing levels.

use std::fmt;

use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum DebugLevel {
    Fail = 0,
    Test = 1,
    Crit = 2,
    GoOn = 3,
    Conf = 4,
    Stub = 5,
    Warn = 6,
    Mild = 7,
    Note = 8,
    Call = 9,
    Info = 10,
    All = 11,
}

impl DebugLevel {
    pub fn from_index(n: i64) -> DebugLevel {
        match n {
            i64::MIN..=0 => DebugLevel::Fail,
            1 => DebugLevel::Test,
            2 => DebugLevel::Crit,
            3 => DebugLevel::GoOn,
            4 => DebugLevel::Conf,
            5 => DebugLevel::Stub,
            6 => DebugLevel::Warn,
            7 => DebugLevel::Mild,
            8 => DebugLevel::Note,
            9 => DebugLevel::Call,
            10 => DebugLevel::Info,
            _ => DebugLevel::All,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Clamp into an inclusive band.
    pub fn clamp_band(self, lo: DebugLevel, hi: DebugLevel) -> DebugLevel {
        DebugLevel::from_index(self.index().clamp(lo.index(), hi.index()) as i64)
    }

    pub fn parse(s: &str) -> Option<DebugLevel> {
        Some(match s.to_ascii_lowercase().as_str() {
            "fail" => DebugLevel::Fail,
            "test" => DebugLevel::Test,
            "crit" => DebugLevel::Crit,
            "goon" => DebugLevel::GoOn,
            "conf" => DebugLevel::Conf,
            "stub" => DebugLevel::Stub,
            "warn" => DebugLevel::Warn,
            "mild" => DebugLevel::Mild,
            "note" => DebugLevel::Note,
            "call" => DebugLevel::Call,
            "info" => DebugLevel::Info,
            "all" => DebugLevel::All,
            _ => return None,
        })
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DebugLevel::Fail => "FAIL",
            DebugLevel::Test => "TEST",
            DebugLevel::Crit => "CRIT",
            DebugLevel::GoOn => "GOON",
            DebugLevel::Conf => "CONF",
            DebugLevel::Stub => "STUB",
            DebugLevel::Warn => "WARN",
            DebugLevel::Mild => "MILD",
            DebugLevel::Note => "NOTE",
            DebugLevel::Call => "CALL",
            DebugLevel::Info => "INFO",
            DebugLevel::All => "ALL",
        })
    }
}

/// Emit one script log line through the host's tracing layer.
pub fn emit(level: DebugLevel, name: &str, trace_id: Option<&str>, message: &str) {
    let tag = trace_id.unwrap_or("");
    match level {
        DebugLevel::Fail | DebugLevel::Test | DebugLevel::Crit => {
            error!(target: "script", source = name, level = %level, trace = tag, "{}", message)
        }
        DebugLevel::GoOn | DebugLevel::Conf | DebugLevel::Stub | DebugLevel::Warn => {
            warn!(target: "script", source = name, level = %level, trace = tag, "{}", message)
        }
        DebugLevel::Mild | DebugLevel::Note => {
            info!(target: "script", source = name, level = %level, trace = tag, "{}", message)
        }
        DebugLevel::Call | DebugLevel::Info => {
            debug!(target: "script", source = name, level = %level, trace = tag, "{}", message)
        }
        DebugLevel::All => {
            trace!(target: "script", source = name, level = %level, trace = tag, "{}", message)
        }
    }
}

#[cfg(test)]
#[path = "levels_tests.rs"]
mod tests;
