//! Property-based tests for the quantified invariants in `SPEC_FULL.md` §8.

use proptest::prelude::*;
use ringalloc::{Config, RingAllocator};

fn new_allocator(size: usize) -> (Box<[u8]>, RingAllocator) {
    let mut buf = vec![0u8; size].into_boxed_slice();
    let ptr = buf.as_mut_ptr();
    let alloc = unsafe { RingAllocator::new(ptr, size, Config::default()) }.unwrap();
    (buf, alloc)
}

proptest! {
    /// I2: a returned pointer always lies inside the buffer, with room for
    /// the requested size after it.
    #[test]
    fn prop_pointer_within_buffer(size in 0u32..512, align_shift in 0u32..4) {
        let (buf, alloc) = new_allocator(4096);
        let alignment = 1u32 << align_shift;
        if let Some(ptr) = alloc.allocate(size, Some(alignment)) {
            let base = buf.as_ptr() as usize;
            let got = ptr as usize;
            prop_assert!(got >= base);
            prop_assert!(got + size as usize <= base + buf.len());
        }
    }
}

proptest! {
    /// Freeing every outstanding allocation in allocation order restores
    /// full availability.
    #[test]
    fn prop_freeing_in_order_restores_availability(
        sizes in prop::collection::vec(16u32..256, 1..20),
    ) {
        let (_buf, alloc) = new_allocator(1 << 16);
        let mut ptrs = Vec::new();
        for size in sizes {
            if let Some(ptr) = alloc.allocate(size, Some(8)) {
                ptrs.push(ptr);
            }
        }
        for ptr in ptrs {
            unsafe { alloc.deallocate(ptr) };
        }
        prop_assert_eq!(alloc.available(), alloc.size());
    }
}

proptest! {
    /// I2/I3: available_size never exceeds total_size, regardless of the
    /// sequence of allocations and frees applied.
    #[test]
    fn prop_available_never_exceeds_total(
        ops in prop::collection::vec((prop::bool::ANY, 16u32..256), 1..40),
    ) {
        let (_buf, alloc) = new_allocator(1 << 14);
        let mut live = Vec::new();
        for (do_alloc, size) in ops {
            if do_alloc || live.is_empty() {
                if let Some(ptr) = alloc.allocate(size, Some(8)) {
                    live.push(ptr);
                }
            } else {
                let ptr = live.remove(0);
                unsafe { alloc.deallocate(ptr) };
            }
            prop_assert!(alloc.available() <= alloc.size());
        }
    }
}
