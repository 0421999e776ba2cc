//! Ordered pending lists
//!
//! Singly-linked index chains over the slot pool. The short-term list is
//! ordered by time-to-target relative to a reference instant, which keeps
//! the ordering correct across counter wraparound. The long-term list is
//! ordered by remaining full periods first, remaining ticks second.
//!
//! Both inserts compare with `<=` while walking, so entries with equal keys
//! land after the ones already present: ties fire in insertion order.

use super::entry::{SlotPool, SlotState};

/// Head of one pending list
#[derive(Debug)]
pub struct TimerList {
    head: Option<usize>,
}

impl TimerList {
    pub const fn new() -> Self {
        Self { head: None }
    }

    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert into the short-term list, ordered by `target - ref_time`.
    ///
    /// `ref_time` is the current counter value; the unsigned difference makes
    /// the comparison wraparound-safe for any target within one period.
    /// Returns `true` if the slot became the new head.
    pub fn insert_short(&mut self, pool: &mut SlotPool, idx: usize, ref_time: u32) -> bool {
        let key = pool.get(idx).target.wrapping_sub(ref_time);

        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if pool.get(c).target.wrapping_sub(ref_time) <= key {
                prev = Some(c);
                cur = pool.get(c).next;
            } else {
                break;
            }
        }

        {
            let slot = pool.get_mut(idx);
            slot.next = cur;
            slot.state = SlotState::Short;
        }
        match prev {
            None => {
                self.head = Some(idx);
                true
            }
            Some(p) => {
                pool.get_mut(p).next = Some(idx);
                false
            }
        }
    }

    /// Insert into the long-term list, ordered by `(long_offset, offset)`.
    pub fn insert_long(&mut self, pool: &mut SlotPool, idx: usize) -> bool {
        let key = {
            let slot = pool.get(idx);
            ((slot.long_offset as u64) << 32) | slot.offset as u64
        };

        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            let slot = pool.get(c);
            let cur_key = ((slot.long_offset as u64) << 32) | slot.offset as u64;
            if cur_key <= key {
                prev = Some(c);
                cur = slot.next;
            } else {
                break;
            }
        }

        {
            let slot = pool.get_mut(idx);
            slot.next = cur;
            slot.state = SlotState::Long;
        }
        match prev {
            None => {
                self.head = Some(idx);
                true
            }
            Some(p) => {
                pool.get_mut(p).next = Some(idx);
                false
            }
        }
    }

    /// Unlink a slot found by identity. Returns `false` if it was not here.
    ///
    /// The slot is left detached (`next` cleared) but still owned by the
    /// caller, who either frees it or re-inserts it elsewhere.
    pub fn unlink(&mut self, pool: &mut SlotPool, idx: usize) -> bool {
        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if c == idx {
                self.unlink_after(pool, prev, c);
                return true;
            }
            prev = Some(c);
            cur = pool.get(c).next;
        }
        false
    }

    /// Unlink `idx` given its known predecessor (`None` for the head).
    pub fn unlink_after(&mut self, pool: &mut SlotPool, prev: Option<usize>, idx: usize) {
        let next = pool.get(idx).next;
        match prev {
            None => self.head = next,
            Some(p) => pool.get_mut(p).next = next,
        }
        pool.get_mut(idx).next = None;
    }

    /// Detach and return the head slot
    pub fn pop_head(&mut self, pool: &mut SlotPool) -> Option<usize> {
        let idx = self.head?;
        self.unlink_after(pool, None, idx);
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::entry::SlotPool;

    fn cb(_token: usize) {}

    fn arm_short(pool: &mut SlotPool, list: &mut TimerList, target: u32, ref_time: u32) -> usize {
        let idx = pool.alloc(cb, 0).unwrap();
        pool.get_mut(idx).target = target;
        pool.get_mut(idx).start = ref_time;
        list.insert_short(pool, idx, ref_time);
        idx
    }

    fn collect(list: &TimerList, pool: &SlotPool) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = list.head();
        while let Some(c) = cur {
            out.push(c);
            cur = pool.get(c).next;
        }
        out
    }

    #[test]
    fn test_short_insert_ordering() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        let late = arm_short(&mut pool, &mut list, 300, 0);
        let early = arm_short(&mut pool, &mut list, 100, 0);
        let mid = arm_short(&mut pool, &mut list, 200, 0);

        assert_eq!(collect(&list, &pool), vec![early, mid, late]);
    }

    #[test]
    fn test_short_insert_head_flag() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        let a = pool.alloc(cb, 0).unwrap();
        pool.get_mut(a).target = 500;
        assert!(list.insert_short(&mut pool, a, 0));

        let b = pool.alloc(cb, 0).unwrap();
        pool.get_mut(b).target = 100;
        assert!(list.insert_short(&mut pool, b, 0));

        let c = pool.alloc(cb, 0).unwrap();
        pool.get_mut(c).target = 900;
        assert!(!list.insert_short(&mut pool, c, 0));
    }

    #[test]
    fn test_short_ordering_across_wraparound() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();
        let ref_time = u32::MAX - 50;

        // Target past the wrap is numerically small but temporally later
        let wrapped = arm_short(&mut pool, &mut list, 100, ref_time);
        let near = arm_short(&mut pool, &mut list, u32::MAX - 10, ref_time);

        assert_eq!(collect(&list, &pool), vec![near, wrapped]);
    }

    #[test]
    fn test_equal_targets_fifo() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        let first = arm_short(&mut pool, &mut list, 100, 0);
        let second = arm_short(&mut pool, &mut list, 100, 0);
        let third = arm_short(&mut pool, &mut list, 100, 0);

        assert_eq!(collect(&list, &pool), vec![first, second, third]);
    }

    #[test]
    fn test_long_insert_ordering() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        let arm_long = |pool: &mut SlotPool, list: &mut TimerList, long: u32, off: u32| {
            let idx = pool.alloc(cb, 0).unwrap();
            pool.get_mut(idx).long_offset = long;
            pool.get_mut(idx).offset = off;
            list.insert_long(pool, idx);
            idx
        };

        let c = arm_long(&mut pool, &mut list, 2, 10);
        let a = arm_long(&mut pool, &mut list, 1, 500);
        let b = arm_long(&mut pool, &mut list, 1, 900);

        assert_eq!(collect(&list, &pool), vec![a, b, c]);
    }

    #[test]
    fn test_equal_long_keys_fifo() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        let arm_long = |pool: &mut SlotPool, list: &mut TimerList, long: u32, off: u32| {
            let idx = pool.alloc(cb, 0).unwrap();
            pool.get_mut(idx).long_offset = long;
            pool.get_mut(idx).offset = off;
            list.insert_long(pool, idx);
            idx
        };

        let first = arm_long(&mut pool, &mut list, 3, 700);
        let second = arm_long(&mut pool, &mut list, 3, 700);
        let third = arm_long(&mut pool, &mut list, 3, 700);

        assert_eq!(collect(&list, &pool), vec![first, second, third]);
    }

    #[test]
    fn test_unlink_head_middle_tail() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        let a = arm_short(&mut pool, &mut list, 100, 0);
        let b = arm_short(&mut pool, &mut list, 200, 0);
        let c = arm_short(&mut pool, &mut list, 300, 0);

        assert!(list.unlink(&mut pool, b));
        assert_eq!(collect(&list, &pool), vec![a, c]);

        assert!(list.unlink(&mut pool, a));
        assert_eq!(collect(&list, &pool), vec![c]);

        assert!(list.unlink(&mut pool, c));
        assert!(list.is_empty());

        assert!(!list.unlink(&mut pool, a));
    }

    #[test]
    fn test_pop_head() {
        let mut pool = SlotPool::new();
        let mut list = TimerList::new();

        assert!(list.pop_head(&mut pool).is_none());

        let a = arm_short(&mut pool, &mut list, 100, 0);
        let b = arm_short(&mut pool, &mut list, 200, 0);

        assert_eq!(list.pop_head(&mut pool), Some(a));
        assert_eq!(pool.get(a).next, None);
        assert_eq!(list.pop_head(&mut pool), Some(b));
        assert!(list.is_empty());
    }
}
