//! Hardware timer trait
//!
//! This module defines the contract the timer core requires from the
//! underlying compare/counter peripheral: a free-running 32-bit counter and
//! a compare register that raises an interrupt when the counter reaches it.
//!
//! The platform is responsible for routing that interrupt to
//! [`TimerCore::handle_compare_irq`](crate::TimerCore::handle_compare_irq).

/// Free-running compare/counter peripheral.
///
/// All methods take `&self`: timer registers are interiorly mutable and the
/// peripheral is shared between thread context and the compare-match ISR.
/// Implementations must make `read` and `set_compare` individually atomic
/// with respect to each other.
///
/// # Counter semantics
///
/// * The counter is 32 bits wide, increments at [`frequency_hz`](Self::frequency_hz)
///   and wraps from `u32::MAX` to `0`.
/// * `set_compare(target)` arms exactly one interrupt, raised when the
///   counter next passes `target` (modulo wraparound). Re-arming replaces
///   any previously programmed target.
pub trait HardwareTimer {
    /// Counter frequency in Hz
    fn frequency_hz(&self) -> u32;

    /// Current free-running counter value
    fn read(&self) -> u32;

    /// Arm the compare-match interrupt for an absolute counter value
    fn set_compare(&self, target: u32);
}

// Shared references work as timers too, so a test can keep a handle to the
// mock peripheral after handing it to the core.
impl<T: HardwareTimer> HardwareTimer for &T {
    fn frequency_hz(&self) -> u32 {
        (**self).frequency_hz()
    }

    fn read(&self) -> u32 {
        (**self).read()
    }

    fn set_compare(&self, target: u32) {
        (**self).set_compare(target)
    }
}
