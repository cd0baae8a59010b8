// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the thread runtime.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// The OS reported transient resource exhaustion on every creation attempt.
    #[error("thread creation failed after {attempts} attempts: {reason}")]
    Exhausted { attempts: u32, reason: String },

    /// Elevated scheduling was refused by the host.
    #[error("permission denied applying priority '{priority}'")]
    PermissionDenied { priority: String },

    /// The requested operation has no support on this platform.
    #[error("{what} is not supported on this platform")]
    Unsupported { what: &'static str },

    /// An affinity mask with no CPU selected.
    #[error("empty CPU affinity mask")]
    EmptyMask,

    /// An affinity mask string that could not be parsed.
    #[error("invalid CPU list '{input}'")]
    InvalidMask { input: String },

    /// Platform call failure, carrying the errno equivalent.
    #[error("{call} failed with code {code}")]
    Os { call: &'static str, code: i32 },
}

/// Marker error returned by exit-checked sleeps when cancellation is pending.
///
/// Worker loops propagate it with `?` to unwind back to their entry point.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("thread cancelled")]
pub struct Cancelled;
