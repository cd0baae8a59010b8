// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tandem-core: message bus and process-wide services.
//!
//! The bus is the engine's spine: every call event, timer tick and admin
//! command flows through it as a [`Message`]. This crate owns the message
//! type, the dispatcher with its prioritized handler table, the threaded
//! queue hooks, the shared-variable store and the clock abstraction.

pub mod bus;
pub mod clock;
pub mod message;
pub mod queue;
pub mod shared;

pub use bus::{FilterValue, HandlerFn, HandlerId, HandlerInfo, MessageBus, MessageFilter, PostHook};
pub use clock::{now_msec, Clock, FakeClock, SystemClock};
pub use message::{replace_params, Message, MessageRef, Tabular};
pub use queue::{QueueHook, ReceivedFn, TrapFn};
pub use shared::SharedVars;
