//! Mock platform implementations for testing
//!
//! Simulated peripherals that let the timer core run on the host without
//! hardware. Time only advances when the test drives it.

pub mod timer;

pub use timer::MockTimer;
