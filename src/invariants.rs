//! Debug assertion macros for allocator invariants.
//!
//! These mirror the invariants documented in `SPEC_FULL.md` §3. They are
//! only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.

// =============================================================================
// I3: buffer_head / buffer_tail bounded by total_size
// =============================================================================

/// Assert that an offset never exceeds the buffer's total size.
///
/// **Invariant**: `offset <= total_size`
macro_rules! debug_assert_offset_in_bounds {
    ($name:literal, $offset:expr, $total_size:expr) => {
        debug_assert!(
            $offset <= $total_size,
            "I3 violated: {} offset {} exceeds total_size {}",
            $name,
            $offset,
            $total_size
        )
    };
}

// =============================================================================
// I1: list-entry index bounded by ring capacity
// =============================================================================

/// Assert that a list-entry index is within the ring's capacity.
///
/// **Invariant**: `index < K`
macro_rules! debug_assert_list_index_in_bounds {
    ($index:expr, $capacity:expr) => {
        debug_assert!(
            ($index as usize) < $capacity,
            "I1 violated: list entry index {} exceeds ring capacity {}",
            $index,
            $capacity
        )
    };
}

// =============================================================================
// I2: available_size never exceeds total_size
// =============================================================================

/// Assert that available size never exceeds the buffer's total size.
///
/// **Invariant**: `0 <= available_size <= total_size`
macro_rules! debug_assert_available_bounded {
    ($available:expr, $total_size:expr) => {
        debug_assert!(
            $available <= $total_size,
            "I2 violated: available_size {} exceeds total_size {}",
            $available,
            $total_size
        )
    };
}

// =============================================================================
// Aligned length must fit the list entry's 16-bit length field
// =============================================================================

/// Assert that an aligned block length fits in the list entry's u16 field.
macro_rules! debug_assert_length_fits_u16 {
    ($aligned:expr) => {
        debug_assert!(
            $aligned <= u32::from(u16::MAX),
            "list entry length {} exceeds u16::MAX",
            $aligned
        )
    };
}

pub(crate) use debug_assert_available_bounded;
pub(crate) use debug_assert_length_fits_u16;
pub(crate) use debug_assert_list_index_in_bounds;
pub(crate) use debug_assert_offset_in_bounds;
