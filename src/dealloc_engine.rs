//! Deallocation engine (C6).

use crate::allocator::RingAllocator;
use crate::atomics::retry_cas_u32;
use crate::error::ErrorCode;
use crate::header::{self, HEADER_SIZE};
use crate::layout;
use crate::list_ring::SlotFlag;
use crate::GAP_SENTINEL;

/// Releases a block previously returned by `allocate`. See `deallocate`'s
/// contract in `SPEC_FULL.md` §4.6.
///
/// # Safety
///
/// `user_ptr` must be a pointer this allocator previously returned and that
/// has not already been deallocated.
pub(crate) unsafe fn deallocate(alloc: &RingAllocator, user_ptr: *mut u8) -> bool {
    alloc.error.clear();

    let base = alloc.base as usize;
    let ptr = user_ptr as usize;
    if ptr < base || ptr > base + alloc.total_size as usize {
        return false;
    }

    if !layout::is_aligned_to(user_ptr, layout::max_fundamental_alignment()) {
        return false;
    }

    let header_ptr = user_ptr.sub(HEADER_SIZE as usize);
    let header_ptr = match header::reinterpret_as_header(header_ptr) {
        Some(p) => p,
        None => return false,
    };
    let header = header_ptr.read();

    if alloc.buffer_tail.load() == alloc.gap_address.load() {
        let _ = retry_cas_u32(&alloc.buffer_tail, |_old| 0);
    }

    if !alloc.list_ring.is_valid_index(header.list_entry_offset) {
        alloc.error.set(ErrorCode::CorruptedBufferBlock);
        return false;
    }
    if !alloc.list_ring.mark_free_preserving(header.list_entry_offset) {
        alloc.error.set(ErrorCode::CorruptedBufferBlock);
        return false;
    }

    let at_tail = {
        let slot = alloc.list_ring.get(header.list_entry_offset);
        let tail = alloc.buffer_tail.load();
        slot.offset.wrapping_sub(u32::from(slot.length)) == tail || tail == 0
    };
    if at_tail {
        drain(alloc);
    }

    alloc.stats.record_deallocation();
    true
}

/// Scans forward from `buffer_tail`, reclaiming contiguous `Free` blocks and
/// advancing `buffer_tail`/`list_tail`/`available_size` as it goes. Stops at
/// the first still-`InUse` block, or at the first corrupt header (leaving
/// the tail where it was, and the primary free from the caller intact).
fn drain(alloc: &RingAllocator) {
    let mut cursor = alloc.buffer_tail.load();
    loop {
        let head = alloc.buffer_head.load();
        if cursor == head {
            break;
        }

        let header_ptr = match unsafe { layout::offset_to_ptr(alloc.base, alloc.total_size, cursor) } {
            Some(p) => p,
            None => {
                alloc.error.set(ErrorCode::CorruptedBufferBlock);
                break;
            }
        };
        let header_ptr = match unsafe { header::reinterpret_as_header(header_ptr) } {
            Some(p) => p,
            None => {
                alloc.error.set(ErrorCode::CorruptedBufferBlock);
                break;
            }
        };
        let header = unsafe { header_ptr.read() };

        if !alloc.list_ring.is_valid_index(header.list_entry_offset) {
            alloc.error.set(ErrorCode::InvalidListEntryOffset);
            break;
        }

        let slot = alloc.list_ring.get(header.list_entry_offset);
        if slot.flag != SlotFlag::Free {
            break;
        }

        let advanced = match retry_cas_u32(&alloc.buffer_tail, |old| old + header.block_length) {
            Some(v) => v,
            None => break,
        };
        alloc.available_size.fetch_add(header.block_length);
        alloc.list_ring.drain_reset(header.list_entry_offset);
        alloc.list_ring.advance_tail(header.list_entry_offset);

        let gap = alloc.gap_address.load();
        cursor = if (gap != GAP_SENTINEL && advanced == gap && head != gap) || advanced >= alloc.total_size {
            let _ = retry_cas_u32(&alloc.buffer_tail, |_old| 0);
            alloc.gap_address.store(GAP_SENTINEL);
            0
        } else {
            advanced
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc_engine;
    use crate::config::Config;

    fn new_allocator(size: usize) -> (Vec<u8>, RingAllocator) {
        let mut buf = vec![0u8; size];
        let ptr = buf.as_mut_ptr();
        let alloc = unsafe { RingAllocator::new(ptr, size, Config::default()).unwrap() };
        (buf, alloc)
    }

    #[test]
    fn round_trip_restores_full_availability() {
        let (_buf, alloc) = new_allocator(4096);
        let ptr = alloc_engine::allocate(&alloc, 64, Some(8)).unwrap();
        let ok = unsafe { deallocate(&alloc, ptr) };
        assert!(ok);
        assert_eq!(alloc.available(), 4096);
        assert_eq!(alloc.last_error(), ErrorCode::NoError);
    }

    #[test]
    fn out_of_order_free_delays_reclamation() {
        let (_buf, alloc) = new_allocator(4096);
        let p1 = alloc_engine::allocate(&alloc, 512, Some(8)).unwrap();
        let p2 = alloc_engine::allocate(&alloc, 512, Some(8)).unwrap();
        let p3 = alloc_engine::allocate(&alloc, 512, Some(8)).unwrap();
        let available_after_allocs = alloc.available();

        assert!(unsafe { deallocate(&alloc, p2) });
        assert_eq!(alloc.available(), available_after_allocs);

        assert!(unsafe { deallocate(&alloc, p1) });
        assert!(alloc.available() > available_after_allocs);

        assert!(unsafe { deallocate(&alloc, p3) });
        assert_eq!(alloc.available(), 4096);
    }

    #[test]
    fn out_of_bounds_pointer_is_rejected() {
        let (_buf, alloc) = new_allocator(4096);
        let bogus = (alloc.base as usize + 1_000_000) as *mut u8;
        assert!(!unsafe { deallocate(&alloc, bogus) });
        assert_eq!(alloc.last_error(), ErrorCode::NoError);
    }
}
