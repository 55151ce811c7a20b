//! Allocation engine (C5).

use crate::allocator::RingAllocator;
use crate::atomics::retry_cas_u32;
use crate::error::ErrorCode;
use crate::header::{self, BlockHeader, HEADER_SIZE};
use crate::invariants::{
    debug_assert_available_bounded, debug_assert_length_fits_u16, debug_assert_offset_in_bounds,
};
use crate::layout;

/// Reserves a block of `size` bytes aligned to `alignment` (or the header's
/// natural alignment if unspecified). See `allocate`'s contract in
/// `SPEC_FULL.md` §4.5.
pub(crate) fn allocate(alloc: &RingAllocator, size: u32, alignment: Option<u32>) -> Option<*mut u8> {
    alloc.error.clear();

    let alignment = alignment.unwrap_or_else(layout::default_alignment);
    let with_header = size.checked_add(HEADER_SIZE)?;
    let aligned = layout::align_up(with_header, alignment)?;

    let available = alloc.available_size.load();
    if aligned >= available {
        return None;
    }

    // Eagerly debit with a single unconditional fetch-sub; never refunded on
    // a failure below (see SPEC_FULL.md §9). Wraps on underflow exactly like
    // the hardware instruction it models, rather than clamping.
    let previous_available = alloc.available_size.fetch_sub(aligned);
    let available_after = previous_available.wrapping_sub(aligned);
    debug_assert_available_bounded!(available_after, alloc.total_size);

    let list_index = alloc.list_ring.claim_slot()?;

    let buffer_head_snapshot = alloc.buffer_head.load();
    let needs_wrap = alloc.total_size.saturating_sub(buffer_head_snapshot) <= aligned;
    if needs_wrap {
        alloc.wrap_around.store(true);
        alloc.gap_address.store(buffer_head_snapshot);
    }
    let is_wrap_winner = alloc.wrap_around.compare_exchange(true, false).is_ok();

    let (block_start, new_head) = if is_wrap_winner {
        let new_head = retry_cas_u32(&alloc.buffer_head, |_old| aligned)?;
        (0, new_head)
    } else {
        let old_head = retry_cas_u32(&alloc.buffer_head, |old| old + aligned)?;
        (old_head - aligned, old_head)
    };

    debug_assert_offset_in_bounds!("block_start", block_start, alloc.total_size);

    // Write the header unconditionally, before the u16::MAX check below, so
    // that even a block whose length can't fit the list entry's length field
    // leaves a valid header behind: a later drain sweep that walks over this
    // offset needs `block_length` to step past it rather than reading a
    // zeroed, never-written header.
    let header_ptr = unsafe {
        let raw = layout::offset_to_ptr(alloc.base, alloc.total_size, block_start)?;
        match header::reinterpret_as_header(raw) {
            Some(ptr) => ptr,
            None => {
                alloc.error.set(ErrorCode::CorruptedBufferBlock);
                return None;
            }
        }
    };
    unsafe {
        header_ptr.write(BlockHeader {
            list_entry_offset: list_index,
            block_length: aligned,
        });
    }

    if aligned > u32::from(u16::MAX) {
        alloc.list_ring.mark_free_preserving(list_index);
        return None;
    }
    debug_assert_length_fits_u16!(aligned);

    if !alloc
        .list_ring
        .commit_in_use(list_index, aligned as u16, new_head)
    {
        return None;
    }

    alloc.stats.record_allocation(alloc.total_size, available_after);

    let user_ptr = unsafe { header_ptr.cast::<u8>().add(HEADER_SIZE as usize) };
    Some(user_ptr)
}
