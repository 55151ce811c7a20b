//! Public façade (C8): the allocator object itself.

use crate::alloc_engine;
use crate::atomics::{CellBool, CellU32};
use crate::config::Config;
use crate::dealloc_engine;
use crate::error::{ConstructionError, ErrorCode, ErrorRegister};
use crate::layout;
use crate::list_ring::ListRing;
use crate::stats::{Stats, Telemetry};
use crate::GAP_SENTINEL;

/// A lock-free, multi-producer/multi-consumer circular allocator over a
/// caller-supplied buffer.
///
/// `RingAllocator` holds no lock; every field shared across threads is one
/// of the atomic indirection cells in [`crate::atomics`]. The backing buffer
/// itself is owned by the caller — `base`/`total_size` only describe it —
/// and must outlive the allocator.
pub struct RingAllocator {
    pub(crate) base: *mut u8,
    pub(crate) total_size: u32,
    pub(crate) buffer_head: CellU32,
    pub(crate) buffer_tail: CellU32,
    pub(crate) gap_address: CellU32,
    pub(crate) wrap_around: CellBool,
    pub(crate) available_size: CellU32,
    pub(crate) list_ring: ListRing,
    pub(crate) error: ErrorRegister,
    pub(crate) stats: Stats,
}

// SAFETY: every field reachable from multiple threads is either an atomic
// cell, or a raw pointer that is only ever dereferenced through the
// bounds/alignment-checked helpers in `layout`. No field is mutated through
// a shared reference without going through one of those cells.
unsafe impl Send for RingAllocator {}
unsafe impl Sync for RingAllocator {}

impl RingAllocator {
    /// Constructs an allocator over `[base, base + size)`.
    ///
    /// This plays the role of the allocator factory: it validates the base
    /// pointer (non-null, aligned to at least the block header's alignment)
    /// and the size (nonzero, fits in `u32`) before any allocator state is
    /// created.
    ///
    /// # Safety
    ///
    /// `base` must point to `size` live, exclusively-owned bytes that
    /// outlive the returned allocator, and no other code may access that
    /// region for the allocator's lifetime except through the pointers it
    /// hands back.
    pub unsafe fn new(
        base: *mut u8,
        size: usize,
        config: Config,
    ) -> Result<Self, ConstructionError> {
        if base.is_null() || !layout::is_aligned_to(base, layout::default_alignment() as usize) {
            return Err(ConstructionError::BaseAddressVoid);
        }
        if size == 0 {
            return Err(ConstructionError::SizeIsZero);
        }
        let total_size: u32 = size.try_into().map_err(|_| ConstructionError::SizeIsZero)?;

        let stats = Stats::new(total_size);
        if config.enable_stats {
            let _ = stats.snapshot(total_size);
        }

        Ok(Self {
            base,
            total_size,
            buffer_head: CellU32::new(0),
            buffer_tail: CellU32::new(0),
            gap_address: CellU32::new(GAP_SENTINEL),
            wrap_around: CellBool::new(false),
            available_size: CellU32::new(total_size),
            list_ring: ListRing::new(config.list_ring_capacity),
            error: ErrorRegister::new(),
            stats,
        })
    }

    /// Reserves `size` bytes aligned to `alignment` (or the header's natural
    /// alignment, if `None`). Returns `None` on exhaustion, retry-budget
    /// exhaustion, or a size that doesn't fit the list entry's length field.
    #[must_use]
    pub fn allocate(&self, size: u32, alignment: Option<u32>) -> Option<*mut u8> {
        alloc_engine::allocate(self, size, alignment)
    }

    /// Releases a block previously returned by [`Self::allocate`].
    ///
    /// # Safety
    ///
    /// `user_ptr` must be a pointer previously returned by `allocate` on
    /// this allocator, not already deallocated.
    pub unsafe fn deallocate(&self, user_ptr: *mut u8) -> bool {
        dealloc_engine::deallocate(self, user_ptr)
    }

    /// Bytes currently available for a new allocation.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.available_size.load()
    }

    /// The buffer's base pointer.
    #[must_use]
    pub fn base(&self) -> *mut u8 {
        self.base
    }

    /// The buffer's total size in bytes.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.total_size
    }

    /// The error code observed during the most recent `allocate`/`deallocate`
    /// call. Cleared at the start of every such call; unaffected by
    /// `stats_snapshot`, `available`, `base`, or `size`.
    #[must_use]
    pub fn last_error(&self) -> ErrorCode {
        self.error.get()
    }

    /// Swaps the accumulated usage counters to zero and returns a snapshot.
    /// Statistics tracking is enabled from the first call onward, regardless
    /// of the construction-time `enable_stats` flag.
    #[must_use]
    pub fn stats_snapshot(&self) -> Telemetry {
        self.stats.snapshot(self.total_size)
    }
}
