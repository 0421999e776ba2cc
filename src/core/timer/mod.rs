//! Timer core
//!
//! Multiplexes an arbitrary number of logical one-shot timers onto a single
//! compare/counter peripheral. Pending timers whose delay fits within one
//! counter period sit in the short-term list, ordered by time-to-target;
//! the short-term head drives the hardware compare register. Longer delays
//! wait in the long-term list, counting down full periods, and migrate into
//! the short-term list as the counter overflows accumulate.
//!
//! All shared state lives behind a `critical_section::Mutex`, so every
//! operation is callable from both thread context and the compare-match ISR.

pub mod clock;
pub mod entry;
pub mod list;
pub mod spin;

use core::cell::RefCell;

use critical_section::Mutex;

use crate::platform::error::{PlatformError, Result, TimerError};
use crate::platform::traits::HardwareTimer;
use clock::VirtualClock;
use entry::{SlotPool, SlotState};
use list::TimerList;

pub use entry::{SetResult, TimerCallback, TimerHandle, MAX_TIMERS};

/// Half of one counter period, used as the heartbeat interval.
///
/// Scheduling a wake-up at most this far ahead guarantees the handler
/// observes every counter wraparound, keeping the virtual clock's high
/// word correct even with no timers pending.
pub const HALF_PERIOD: u32 = 0x8000_0000;

/// Timer core configuration
///
/// Both thresholds are in hardware ticks.
#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    /// Below this offset, `set_from_now` spins instead of scheduling
    pub backoff: u32,
    /// Within this margin of due, the handler fires an entry immediately
    /// rather than deferring it one more hardware period
    pub isr_backoff: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            backoff: 30,
            isr_backoff: 20,
        }
    }
}

/// Shared mutable state: slot pool, both pending lists, virtual clock
#[derive(Debug)]
struct TimerMux {
    pool: SlotPool,
    short: TimerList,
    long: TimerList,
    clock: VirtualClock,
    /// Set for the duration of `handle_compare_irq`; suppresses hardware
    /// reprogramming from set/remove calls made by expiry callbacks. The
    /// handler reprograms once after the lists stabilize.
    in_handler: bool,
}

impl TimerMux {
    fn new() -> Self {
        Self {
            pool: SlotPool::new(),
            short: TimerList::new(),
            long: TimerList::new(),
            clock: VirtualClock::new(),
            in_handler: false,
        }
    }
}

/// Multiplexed timer core over one hardware compare/counter peripheral
///
/// Construct one instance per peripheral and route that peripheral's
/// compare-match interrupt to [`handle_compare_irq`](Self::handle_compare_irq).
pub struct TimerCore<T: HardwareTimer> {
    hw: T,
    config: TimerConfig,
    mux: Mutex<RefCell<TimerMux>>,
}

impl<T: HardwareTimer> TimerCore<T> {
    /// Create a timer core and arm the initial heartbeat wake-up.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::InvalidConfig` if either threshold is half a
    /// counter period or more.
    pub fn new(hw: T, config: TimerConfig) -> Result<Self> {
        if config.backoff >= HALF_PERIOD || config.isr_backoff >= HALF_PERIOD {
            return Err(PlatformError::InvalidConfig);
        }

        let core = Self {
            hw,
            config,
            mux: Mutex::new(RefCell::new(TimerMux::new())),
        };
        // Keep the overflow word advancing even before the first set
        let now = core.hw.read();
        core.hw.set_compare(now.wrapping_add(HALF_PERIOD));
        Ok(core)
    }

    /// Counter frequency in Hz, as reported by the peripheral
    pub fn frequency_hz(&self) -> u32 {
        self.hw.frequency_hz()
    }

    /// Current hardware counter value (low 32 bits of virtual time)
    pub fn now(&self) -> u32 {
        self.hw.read()
    }

    /// Current 64-bit virtual time.
    ///
    /// The counter and the software high word are sampled inside one
    /// critical section, so the pair is consistent. Successive reads never
    /// go backwards, including across counter wraparound.
    pub fn now64(&self) -> u64 {
        critical_section::with(|cs| {
            let mux = self.mux.borrow_ref(cs);
            mux.clock.now64(self.hw.read())
        })
    }

    /// Arm a one-shot timer `offset` ticks from now.
    ///
    /// Offsets below the configured backoff are spun synchronously: the
    /// callback runs in the caller's context before this returns, and the
    /// result is [`SetResult::Fired`]. Larger offsets are queued on the
    /// short-term list and fire from the compare-match handler.
    ///
    /// The callback runs exactly once unless the timer is removed first.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::SlotsExhausted` when all [`MAX_TIMERS`] slots
    /// are armed.
    pub fn set_from_now(
        &self,
        offset: u32,
        callback: TimerCallback,
        token: usize,
    ) -> Result<SetResult> {
        if offset < self.config.backoff {
            // Too short to schedule without racing the compare register
            spin::spin(&self.hw, offset);
            callback(token);
            return Ok(SetResult::Fired);
        }

        critical_section::with(|cs| {
            let mut mux = self.mux.borrow_ref_mut(cs);
            let now = self.hw.read();

            let idx = match mux.pool.alloc(callback, token) {
                Some(idx) => idx,
                None => {
                    crate::log_warn!("timer pool exhausted ({} slots)", MAX_TIMERS);
                    return Err(TimerError::SlotsExhausted.into());
                }
            };
            {
                let slot = mux.pool.get_mut(idx);
                slot.start = now;
                slot.offset = offset;
                slot.target = now.wrapping_add(offset);
            }

            let became_head = {
                let TimerMux { pool, short, .. } = &mut *mux;
                short.insert_short(pool, idx, now)
            };
            if became_head && !mux.in_handler {
                self.program_wakeup(&mux, now);
            }
            Ok(SetResult::Armed(mux.pool.handle(idx)))
        })
    }

    /// Arm a one-shot timer with a 64-bit tick offset.
    ///
    /// Offsets that fit within one counter period delegate to
    /// [`set_from_now`](Self::set_from_now). Longer offsets are split into
    /// full periods (high word) and remainder ticks (low word) and queued on
    /// the long-term list; the entry migrates to the short-term list once
    /// the remaining full periods reach zero.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::SlotsExhausted` when all [`MAX_TIMERS`] slots
    /// are armed.
    pub fn set64_from_now(
        &self,
        offset: u64,
        callback: TimerCallback,
        token: usize,
    ) -> Result<SetResult> {
        if offset <= u32::MAX as u64 {
            return self.set_from_now(offset as u32, callback, token);
        }

        critical_section::with(|cs| {
            let mut mux = self.mux.borrow_ref_mut(cs);
            let now = self.hw.read();

            let idx = match mux.pool.alloc(callback, token) {
                Some(idx) => idx,
                None => {
                    crate::log_warn!("timer pool exhausted ({} slots)", MAX_TIMERS);
                    return Err(TimerError::SlotsExhausted.into());
                }
            };
            {
                let slot = mux.pool.get_mut(idx);
                slot.start = now;
                slot.offset = offset as u32;
                slot.long_offset = (offset >> 32) as u32;
            }

            let TimerMux { pool, long, .. } = &mut *mux;
            long.insert_long(pool, idx);
            // Long entries never drive the compare register directly; the
            // heartbeat cadence is enough to count down their periods.
            Ok(SetResult::Armed(mux.pool.handle(idx)))
        })
    }

    /// Cancel an armed timer.
    ///
    /// Idempotent: a handle that never armed, already fired, or was already
    /// removed is recognized by its generation and ignored. Removing the
    /// short-term head reprograms the hardware for the next pending entry
    /// (or the heartbeat if none remain).
    pub fn remove(&self, handle: TimerHandle) {
        critical_section::with(|cs| {
            let mut mux = self.mux.borrow_ref_mut(cs);
            if !mux.pool.is_live(handle) {
                return;
            }
            let idx = handle.index;
            let state = mux.pool.get(idx).state;

            let reprogram = {
                let TimerMux {
                    pool,
                    short,
                    long,
                    in_handler,
                    ..
                } = &mut *mux;
                let was_short_head = state == SlotState::Short && short.head() == Some(idx);
                match state {
                    SlotState::Short => short.unlink(pool, idx),
                    SlotState::Long => long.unlink(pool, idx),
                    SlotState::Free => unreachable!("live slot cannot be free"),
                };
                pool.free(idx);
                was_short_head && !*in_handler
            };

            if reprogram {
                let now = self.hw.read();
                self.program_wakeup(&mux, now);
            }
        })
    }

    /// Compare-match handler. Call this, and nothing else, from the
    /// peripheral's compare interrupt.
    ///
    /// Fires every due short-term entry (spinning out the last few ticks if
    /// the interrupt arrived inside the ISR backoff margin, so nothing fires
    /// early), counts down the long-term list, migrates matured entries, and
    /// re-checks until the lists stabilize. Finally reprograms the compare
    /// register for the next wake-up.
    ///
    /// Callbacks run synchronously, between list updates, outside the state
    /// borrow: they may arm or remove timers themselves. Not re-entrant; the
    /// platform must not nest this interrupt with itself.
    pub fn handle_compare_irq(&self) {
        critical_section::with(|cs| {
            self.mux.borrow_ref_mut(cs).in_handler = true;
        });

        loop {
            if self.fire_next_due() {
                continue;
            }
            // Long-list countdown may migrate entries that are already due,
            // so a successful migration loops back to the firing pass.
            let migrated = critical_section::with(|cs| {
                let mut mux = self.mux.borrow_ref_mut(cs);
                let now = self.hw.read();
                mux.clock.note(now);
                Self::update_long(&mut mux, now)
            });
            if !migrated {
                break;
            }
        }

        critical_section::with(|cs| {
            let mut mux = self.mux.borrow_ref_mut(cs);
            let now = self.hw.read();
            mux.clock.note(now);
            mux.in_handler = false;
            self.program_wakeup(&mux, now);
        });
    }

    /// Fire the short-term head if it is due (or within the ISR backoff
    /// margin of due). Returns whether a callback ran.
    fn fire_next_due(&self) -> bool {
        let due = critical_section::with(|cs| {
            let mut mux = self.mux.borrow_ref_mut(cs);
            let now = self.hw.read();
            mux.clock.note(now);

            let head = match mux.short.head() {
                Some(head) => head,
                None => return None,
            };
            let (total, elapsed) = {
                let slot = mux.pool.get(head);
                (
                    slot.target.wrapping_sub(slot.start),
                    now.wrapping_sub(slot.start),
                )
            };
            if (elapsed as u64) + (self.config.isr_backoff as u64) < total as u64 {
                return None;
            }

            // Due (or close enough that deferring a full period would be
            // worse). Detach before invoking so the callback can re-arm.
            let remaining = if elapsed >= total { 0 } else { total - elapsed };
            let TimerMux { pool, short, .. } = &mut *mux;
            short.pop_head(pool);
            let callback = pool.get(head).callback;
            let token = pool.get(head).token;
            pool.free(head);
            Some((callback, token, remaining))
        });

        match due {
            Some((callback, token, remaining)) => {
                if remaining > 0 {
                    // Inside the margin but not yet due: never fire early
                    spin::spin(&self.hw, remaining);
                }
                callback(token);
                true
            }
            None => false,
        }
    }

    /// Subtract elapsed ticks from every long-term entry, borrowing from
    /// `long_offset` on underflow, and migrate entries whose full-period
    /// count reached zero into the short-term list. Returns whether any
    /// entry migrated.
    fn update_long(mux: &mut TimerMux, now: u32) -> bool {
        let TimerMux {
            pool, short, long, ..
        } = &mut *mux;

        let mut migrated = false;
        let mut prev: Option<usize> = None;
        let mut cur = long.head();
        while let Some(c) = cur {
            let (next, matured) = {
                let slot = pool.get_mut(c);
                let elapsed = now.wrapping_sub(slot.start);
                slot.start = now;
                // Strict comparison: elapsed exactly equal to the remaining
                // low word leaves offset == 0 without borrowing a period.
                if elapsed > slot.offset {
                    slot.long_offset -= 1;
                }
                slot.offset = slot.offset.wrapping_sub(elapsed);
                (slot.next, slot.long_offset == 0)
            };

            if matured {
                long.unlink_after(pool, prev, c);
                {
                    let slot = pool.get_mut(c);
                    slot.target = now.wrapping_add(slot.offset);
                }
                short.insert_short(pool, c, now);
                migrated = true;
            } else {
                prev = Some(c);
            }
            cur = next;
        }
        migrated
    }

    /// Program the next hardware wake-up: the short-term head's target when
    /// it is within reach, otherwise a heartbeat half a period out.
    ///
    /// A head that went due between the caller's last due-check and this
    /// reprogram (interrupt latency, a preempting ISR) has a target in the
    /// past; `target - now` then wraps to a huge value and must not be
    /// mistaken for a far-future target. The elapsed/total comparison below
    /// tells the two apart, and an overdue head gets an immediate wake-up
    /// rather than a heartbeat half a period out.
    fn program_wakeup(&self, mux: &TimerMux, now: u32) {
        let target = match mux.short.head() {
            Some(head) => {
                let slot = mux.pool.get(head);
                let total = slot.target.wrapping_sub(slot.start);
                let elapsed = now.wrapping_sub(slot.start);
                if (elapsed as u64) + (self.config.isr_backoff as u64) >= total as u64 {
                    // Compare must land strictly ahead of the counter
                    now.wrapping_add(self.config.isr_backoff.max(1))
                } else if slot.target.wrapping_sub(now) > HALF_PERIOD {
                    now.wrapping_add(HALF_PERIOD)
                } else {
                    slot.target
                }
            }
            None => now.wrapping_add(HALF_PERIOD),
        };
        self.hw.set_compare(target);
    }
}
