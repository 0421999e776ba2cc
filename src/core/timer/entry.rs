//! Timer slot pool and handles
//!
//! Pending timers live in a fixed-capacity pool owned by the core; the two
//! pending lists are index chains over this pool. Arming a timer hands the
//! caller a generation-checked [`TimerHandle`], so a handle kept past the
//! timer's firing (or removal, or slot reuse) is detected and ignored
//! instead of corrupting list state.

/// Maximum number of concurrently pending timers
///
/// This limit is set conservatively to avoid excessive static memory usage.
/// Current allocation: 32 slots x ~40 bytes = ~1.3KB per core instance.
pub const MAX_TIMERS: usize = 32;

/// Timer expiry callback
///
/// Invoked exactly once per successful arm, synchronously from interrupt
/// context (or from the caller's context on the spin path). The token is
/// the value passed to `set_from_now`.
pub type TimerCallback = fn(usize);

/// Which pending list a slot currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Not armed; slot is on the free list
    Free,
    /// Armed, delay fits within one counter period
    Short,
    /// Armed, delay spans one or more full counter periods
    Long,
}

/// One pending timer
#[derive(Debug)]
pub struct Slot {
    /// Absolute counter value to fire at (short list only)
    pub target: u32,
    /// Remaining ticks below one period
    pub offset: u32,
    /// Remaining full counter periods (long list only)
    pub long_offset: u32,
    /// Counter value at which `offset` was last valid
    pub start: u32,
    /// Expiry callback
    pub callback: TimerCallback,
    /// Opaque value passed to the callback
    pub token: usize,
    /// Next slot in the containing list (pending or free)
    pub next: Option<usize>,
    /// Bumped every time the slot is released; stale handles miss
    pub generation: u32,
    /// Containing list
    pub state: SlotState,
}

fn noop_callback(_token: usize) {}

impl Slot {
    const fn vacant() -> Self {
        Self {
            target: 0,
            offset: 0,
            long_offset: 0,
            start: 0,
            callback: noop_callback,
            token: 0,
            next: None,
            generation: 0,
            state: SlotState::Free,
        }
    }
}

/// Handle to an armed timer
///
/// Returned by the set operations; consumed by `remove`. Handles outlive
/// the timers they name safely: once the timer fires or is removed, the
/// slot's generation is bumped and the handle stops matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Outcome of a set operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    /// Delay was below the spin threshold; callback already ran
    Fired,
    /// Timer armed; cancel with `remove` if needed
    Armed(TimerHandle),
}

/// Fixed-capacity slot pool with an intrusive free list
#[derive(Debug)]
pub struct SlotPool {
    slots: [Slot; MAX_TIMERS],
    free_head: Option<usize>,
}

impl SlotPool {
    pub fn new() -> Self {
        // Free chain threads the whole array front to back
        let slots = core::array::from_fn(|i| {
            let mut slot = Slot::vacant();
            if i + 1 < MAX_TIMERS {
                slot.next = Some(i + 1);
            }
            slot
        });
        Self {
            slots,
            free_head: Some(0),
        }
    }

    /// Claim a free slot for a new timer
    ///
    /// Returns `None` when all slots are armed. Timing fields are reset;
    /// the caller fills them in before inserting the slot into a list.
    pub fn alloc(&mut self, callback: TimerCallback, token: usize) -> Option<usize> {
        let idx = self.free_head?;
        self.free_head = self.slots[idx].next;

        let slot = &mut self.slots[idx];
        slot.target = 0;
        slot.offset = 0;
        slot.long_offset = 0;
        slot.start = 0;
        slot.callback = callback;
        slot.token = token;
        slot.next = None;
        Some(idx)
    }

    /// Release a slot back to the free list, invalidating outstanding handles
    pub fn free(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        slot.state = SlotState::Free;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next = self.free_head;
        self.free_head = Some(idx);
    }

    pub fn get(&self, idx: usize) -> &Slot {
        &self.slots[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Slot {
        &mut self.slots[idx]
    }

    /// Handle for a just-allocated slot
    pub fn handle(&self, idx: usize) -> TimerHandle {
        TimerHandle {
            index: idx,
            generation: self.slots[idx].generation,
        }
    }

    /// Whether a handle still names an armed timer
    pub fn is_live(&self, handle: TimerHandle) -> bool {
        let slot = &self.slots[handle.index];
        slot.state != SlotState::Free && slot.generation == handle.generation
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new()
    }
}
