//! List-entry ring (C3): the ordered, fixed-capacity index of live blocks.

use crate::atomics::{CellU32, CellU64};
use crate::backoff::Backoff;
use crate::invariants::debug_assert_list_index_in_bounds;
use crate::MAX_RETRIES;

#[cfg(any(test, feature = "test-util"))]
use crate::atomics::FaultInjector;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Arc;

/// A list-entry's occupancy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotFlag {
    Free,
    InUse,
}

/// A single list-entry slot: occupancy plus the block's aligned length and
/// end-offset. The three fields are always read and written together as one
/// 64-bit word (see [`Slot::encode`]/[`Slot::decode`]) so a whole-slot CAS
/// keeps them consistent — never mutated field-by-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub flag: SlotFlag,
    pub length: u16,
    pub offset: u32,
}

impl Slot {
    pub(crate) const FREE: Slot = Slot {
        flag: SlotFlag::Free,
        length: 0,
        offset: 0,
    };

    fn encode(self) -> u64 {
        let flag_bit: u64 = match self.flag {
            SlotFlag::Free => 0,
            SlotFlag::InUse => 1,
        };
        flag_bit | (u64::from(self.length) << 1) | (u64::from(self.offset) << 17)
    }

    fn decode(word: u64) -> Self {
        let flag = if word & 1 == 1 {
            SlotFlag::InUse
        } else {
            SlotFlag::Free
        };
        let length = ((word >> 1) & 0xFFFF) as u16;
        let offset = ((word >> 17) & 0xFFFF_FFFF) as u32;
        Slot {
            flag,
            length,
            offset,
        }
    }
}

/// The fixed-capacity ring `R` of slot descriptors, indexed by `list_head`
/// (advanced on allocation) and `list_tail` (advanced on drain). Index 0 is
/// a reserved sentinel: a freshly zero-initialized slot is indistinguishable
/// from a committed Free slot, so the ring never assigns index 0 to a real
/// allocation.
pub(crate) struct ListRing {
    slots: Box<[CellU64]>,
    head: CellU32,
    tail: CellU32,
    capacity: usize,
}

impl ListRing {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "list ring capacity must be at least 2");
        let slots: Vec<CellU64> = (0..capacity)
            .map(|_| CellU64::new(Slot::FREE.encode()))
            .collect();
        Self {
            slots: slots.into_boxed_slice(),
            head: CellU32::new(0),
            tail: CellU32::new(0),
            capacity,
        }
    }

    /// Same as [`Self::new`] but with the `list_head` cell wired to a
    /// [`FaultInjector`], so `claim_slot`'s retry-exhaustion branch can be
    /// exercised deterministically (see `E6` in `SPEC_FULL.md` §8).
    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn new_with_head_fault(capacity: usize, fault: Arc<FaultInjector>) -> Self {
        assert!(capacity >= 2, "list ring capacity must be at least 2");
        let slots: Vec<CellU64> = (0..capacity)
            .map(|_| CellU64::new(Slot::FREE.encode()))
            .collect();
        Self {
            slots: slots.into_boxed_slice(),
            head: CellU32::new_with_fault(0, fault),
            tail: CellU32::new(0),
            capacity,
        }
    }

    pub(crate) fn is_valid_index(&self, index: u32) -> bool {
        (index as usize) < self.capacity
    }

    fn next_head(&self, old: u32) -> u32 {
        (old + 1) % (self.capacity as u32 - 1)
    }

    /// Claims the next list-entry index for a new allocation via the
    /// sentinel-skipping modular increment, bounded by `MAX_RETRIES`
    /// attempts. Returns `None` if the CAS never succeeds within the budget.
    pub(crate) fn claim_slot(&self) -> Option<u32> {
        let mut backoff = Backoff::new();
        for _ in 0..MAX_RETRIES {
            let old = self.head.load();
            let new = self.next_head(old);
            if self.head.compare_exchange(old, new).is_ok() {
                return Some(new);
            }
            backoff.spin();
        }
        None
    }

    pub(crate) fn get(&self, index: u32) -> Slot {
        debug_assert_list_index_in_bounds!(index, self.capacity);
        Slot::decode(self.slots[index as usize].load())
    }

    /// Marks a slot Free while preserving its `length`/`offset`, so a later
    /// drain pass can still read them. Used by the deallocation engine's
    /// primary free (step 6 in `SPEC_FULL.md` §4.6).
    pub(crate) fn mark_free_preserving(&self, index: u32) -> bool {
        if !self.is_valid_index(index) {
            return false;
        }
        let cell = &self.slots[index as usize];
        for _ in 0..MAX_RETRIES {
            let old = cell.load();
            let mut slot = Slot::decode(old);
            slot.flag = SlotFlag::Free;
            let new = slot.encode();
            if cell.compare_exchange(old, new).is_ok() {
                return true;
            }
        }
        false
    }

    /// Installs a newly allocated block's slot: `InUse`, with the given
    /// length and end-offset. Used by the allocation engine's commit step.
    pub(crate) fn commit_in_use(&self, index: u32, length: u16, offset: u32) -> bool {
        if !self.is_valid_index(index) {
            return false;
        }
        let cell = &self.slots[index as usize];
        for _ in 0..MAX_RETRIES {
            let old = cell.load();
            let new = Slot {
                flag: SlotFlag::InUse,
                length,
                offset,
            }
            .encode();
            if cell.compare_exchange(old, new).is_ok() {
                return true;
            }
        }
        false
    }

    /// Resets a drained slot to `{Free, 0, 0}` in a single CAS. The original
    /// implementation performs this as two separate writes (mark Free, then
    /// zero length/offset); we collapse them since the scan only ever
    /// inspects `flag` before consulting `length`/`offset`, and nothing reads
    /// the slot between the two original writes (see `SPEC_FULL.md` §9).
    pub(crate) fn drain_reset(&self, index: u32) -> bool {
        if !self.is_valid_index(index) {
            return false;
        }
        let cell = &self.slots[index as usize];
        for _ in 0..MAX_RETRIES {
            let old = cell.load();
            if cell.compare_exchange(old, Slot::FREE.encode()).is_ok() {
                return true;
            }
        }
        false
    }

    /// Advances `list_tail` to `index`, bounded by `MAX_RETRIES`.
    pub(crate) fn advance_tail(&self, index: u32) -> bool {
        for _ in 0..MAX_RETRIES {
            let old = self.tail.load();
            if self.tail.compare_exchange(old, index).is_ok() {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_round_trips_through_encoding() {
        let slot = Slot {
            flag: SlotFlag::InUse,
            length: 1234,
            offset: 0xABCDEF,
        };
        assert_eq!(Slot::decode(slot.encode()), slot);
    }

    #[test]
    fn claim_slot_skips_sentinel_zero() {
        let ring = ListRing::new(4);
        let first = ring.claim_slot().unwrap();
        assert_ne!(first, 0);
    }

    #[test]
    fn commit_then_mark_free_then_drain_reset() {
        let ring = ListRing::new(8);
        let idx = ring.claim_slot().unwrap();
        assert!(ring.commit_in_use(idx, 64, 128));
        assert_eq!(ring.get(idx).flag, SlotFlag::InUse);

        assert!(ring.mark_free_preserving(idx));
        let slot = ring.get(idx);
        assert_eq!(slot.flag, SlotFlag::Free);
        assert_eq!(slot.length, 64);
        assert_eq!(slot.offset, 128);

        assert!(ring.drain_reset(idx));
        assert_eq!(ring.get(idx), Slot::FREE);
    }

    #[test]
    fn claim_slot_succeeds_on_the_last_retry() {
        let fault = FaultInjector::new(199);
        let ring = ListRing::new_with_head_fault(64, fault);
        assert!(ring.claim_slot().is_some());
    }

    #[test]
    fn claim_slot_exhausts_retry_budget() {
        let fault = FaultInjector::new(200);
        let ring = ListRing::new_with_head_fault(64, fault);
        assert!(ring.claim_slot().is_none());
    }

    #[test]
    fn next_head_wraps_before_capacity() {
        let ring = ListRing::new(4);
        // capacity 4 => indices cycle through 1,2,3 then back to 1 (0 reserved)
        let mut seen = vec![];
        for _ in 0..6 {
            seen.push(ring.claim_slot().unwrap());
        }
        assert!(seen.iter().all(|&i| i != 0));
        assert!(seen.iter().all(|&i| i < 4));
    }
}
