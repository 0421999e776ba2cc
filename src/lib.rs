#![cfg_attr(not(test), no_std)]

//! tickmux - Multiplexed high-resolution timers for embedded targets
//!
//! This library provides an arbitrary number of logical one-shot timers on
//! top of a single hardware compare/counter peripheral. It maintains a
//! two-tier (short-term/long-term) pending list with wraparound-safe
//! ordering over the 32-bit hardware counter, a 64-bit virtual clock, and a
//! spin-wait path for delays too short to schedule safely.

// Platform abstraction layer (hardware timer contract + mock for host tests)
pub mod platform;

// Timer core (virtual clock, pending lists, compare-match handler)
pub mod core;

pub use crate::core::timer::{SetResult, TimerConfig, TimerCore, TimerHandle};
pub use platform::traits::HardwareTimer;
pub use platform::{PlatformError, Result};

#[cfg(any(test, feature = "mock"))]
pub use platform::mock::MockTimer;
