//! Mock hardware timer for testing
//!
//! Simulated compare/counter peripheral. The counter is a plain `Cell` the
//! test advances by hand; compare-match detection is reported back so the
//! test can dispatch [`handle_compare_irq`](crate::TimerCore::handle_compare_irq)
//! at the right simulated instant.

use core::cell::Cell;

use crate::platform::traits::HardwareTimer;

/// Default simulated counter frequency (1 MHz)
pub const MOCK_FREQUENCY_HZ: u32 = 1_000_000;

/// Mock compare/counter peripheral
///
/// Time never advances on its own. Tests either call [`advance`](Self::advance)
/// / [`set_now`](Self::set_now), or configure [`step_on_read`](Self::step_on_read)
/// so that busy-wait loops inside the core observe the counter moving.
#[derive(Debug)]
pub struct MockTimer {
    now: Cell<u32>,
    compare: Cell<u32>,
    armed: Cell<bool>,
    step_on_read: Cell<u32>,
}

impl MockTimer {
    /// Create a mock timer with the counter at zero
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            compare: Cell::new(0),
            armed: Cell::new(false),
            step_on_read: Cell::new(0),
        }
    }

    /// Current counter value, without the read side effect
    pub fn peek(&self) -> u32 {
        self.now.get()
    }

    /// Force the counter to an absolute value
    pub fn set_now(&self, now: u32) {
        self.now.set(now);
    }

    /// Ticks added to the counter on every `read()`
    ///
    /// Zero by default. Set to a nonzero value for tests that exercise the
    /// spin-wait paths, which poll `read()` until time has passed.
    pub fn step_on_read(&self, ticks: u32) {
        self.step_on_read.set(ticks);
    }

    /// Advance the counter by `ticks`, reporting a compare match
    ///
    /// Returns `true` if an armed compare target was reached inside the
    /// advanced window (wraparound-aware), in which case the armed flag is
    /// cleared and the caller is expected to dispatch the core handler.
    pub fn advance(&self, ticks: u32) -> bool {
        let old = self.now.get();
        self.now.set(old.wrapping_add(ticks));

        if !self.armed.get() {
            return false;
        }
        let until = self.compare.get().wrapping_sub(old);
        if until <= ticks {
            self.armed.set(false);
            true
        } else {
            false
        }
    }

    /// Ticks until the armed compare target, or `None` when disarmed
    pub fn pending_compare(&self) -> Option<u32> {
        if self.armed.get() {
            Some(self.compare.get().wrapping_sub(self.now.get()))
        } else {
            None
        }
    }

    /// Absolute compare target most recently programmed
    pub fn compare_target(&self) -> u32 {
        self.compare.get()
    }
}

impl Default for MockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareTimer for MockTimer {
    fn frequency_hz(&self) -> u32 {
        MOCK_FREQUENCY_HZ
    }

    fn read(&self) -> u32 {
        let now = self.now.get().wrapping_add(self.step_on_read.get());
        self.now.set(now);
        now
    }

    fn set_compare(&self, target: u32) {
        self.compare.set(target);
        self.armed.set(true);
    }
}
