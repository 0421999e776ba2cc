//! Virtual 64-bit clock
//!
//! Extends the 32-bit hardware counter with a software-maintained high word.
//! The high word is only ever incremented by the compare-match handler, which
//! is guaranteed to run at least twice per counter period by the heartbeat
//! wake-up, so every wraparound is observed.

/// Software extension of the hardware counter to 64 bits
#[derive(Debug)]
pub struct VirtualClock {
    /// Overflow count (high 32 bits of virtual time)
    high: u32,
    /// Counter value most recently observed by the handler
    last_low: u32,
}

impl VirtualClock {
    pub const fn new() -> Self {
        Self {
            high: 0,
            last_low: 0,
        }
    }

    /// Record a counter observation from the compare-match handler.
    ///
    /// A sample below the previous one means the counter wrapped since the
    /// handler last ran. Handler cadence (at most half a period apart) rules
    /// out a double wrap between observations.
    pub fn note(&mut self, low: u32) {
        if low < self.last_low {
            self.high = self.high.wrapping_add(1);
        }
        self.last_low = low;
    }

    /// Combine a fresh counter sample with the high word.
    ///
    /// Pure read: a sample below the handler's last observation means one
    /// wrap is pending but not yet recorded, so it is accounted for here to
    /// keep successive reads monotonic. Callers must sample the counter and
    /// call this inside the same critical section.
    pub fn now64(&self, low: u32) -> u64 {
        let mut high = self.high;
        if low < self.last_low {
            high = high.wrapping_add(1);
        }
        ((high as u64) << 32) | low as u64
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}
