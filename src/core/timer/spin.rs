//! Busy-wait delay
//!
//! Used for delays too short to schedule through the compare register: a
//! target computed from "now" for a handful of ticks may already have passed
//! by the time it is programmed, so the core spins instead.

use crate::platform::traits::HardwareTimer;

/// Busy-wait until `ticks` have elapsed on the hardware counter.
///
/// Wraparound-safe; blocks the calling context for the full duration.
pub fn spin<T: HardwareTimer>(hw: &T, ticks: u32) {
    let start = hw.read();
    while hw.read().wrapping_sub(start) < ticks {
        core::hint::spin_loop();
    }
}
