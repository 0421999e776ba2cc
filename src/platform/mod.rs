//! Platform abstraction layer
//!
//! This module isolates everything the timer core needs from the hardware:
//! a single free-running compare/counter peripheral. Board and chip code
//! lives outside this crate and plugs in by implementing [`traits::HardwareTimer`]
//! and routing its compare-match interrupt to the core handler.

pub mod error;
pub mod traits;

// Simulated peripheral for host-side tests
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{PlatformError, Result, TimerError};
pub use traits::HardwareTimer;
