//! Optional usage telemetry.
//!
//! Counters are accumulated continuously and swapped to zero by
//! [`Telemetry`]'s producer, `RingAllocator::stats_snapshot`, mirroring the
//! external telemetry collaborator this crate was designed to feed (see
//! `SPEC_FULL.md` §6).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// A point-in-time usage snapshot since the previous `stats_snapshot` call
/// (or since construction, for the first call).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// Peak bytes in use since the last snapshot.
    pub tmd_max: usize,
    /// Mean bytes in use per allocation since the last snapshot.
    pub tmd_average: usize,
    /// Deallocations per allocation since the last snapshot.
    pub tmd_alloc_rate: f32,
}

pub(crate) struct Stats {
    enabled: AtomicBool,
    /// Lowest `available_size` observed since the last snapshot; reset to
    /// `total_size` on construction and on every snapshot.
    lowest_available: AtomicU32,
    cumulative_usage: AtomicU64,
    alloc_count: AtomicU32,
    dealloc_count: AtomicU32,
}

impl Stats {
    pub(crate) fn new(total_size: u32) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            lowest_available: AtomicU32::new(total_size),
            cumulative_usage: AtomicU64::new(0),
            alloc_count: AtomicU32::new(0),
            dealloc_count: AtomicU32::new(0),
        }
    }

    /// Called from the allocation engine after a successful allocation.
    /// Only accumulates once statistics have been switched on by a prior
    /// `stats_snapshot` call — matching the source, where the allocation
    /// counter only advances while tracking is enabled but the deallocation
    /// counter advances unconditionally (see `record_deallocation`).
    pub(crate) fn record_allocation(&self, total_size: u32, available_after: u32) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        self.lowest_available
            .fetch_min(available_after, Ordering::SeqCst);
        let used = u64::from(total_size - available_after);
        self.cumulative_usage.fetch_add(used, Ordering::SeqCst);
        self.alloc_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Called from the deallocation engine on every successful free,
    /// regardless of whether statistics are enabled.
    pub(crate) fn record_deallocation(&self) {
        self.dealloc_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self, total_size: u32) -> Telemetry {
        self.enabled.store(true, Ordering::Release);

        let lowest = self.lowest_available.swap(total_size, Ordering::SeqCst);
        let tmd_max = (total_size - lowest) as usize;

        let number_of_allocations = self.alloc_count.swap(0, Ordering::SeqCst).max(1);
        let cumulative = self.cumulative_usage.swap(0, Ordering::SeqCst);
        let dealloc_count = self.dealloc_count.swap(0, Ordering::SeqCst);

        Telemetry {
            tmd_max,
            tmd_average: (cumulative / u64::from(number_of_allocations)) as usize,
            tmd_alloc_rate: dealloc_count as f32 / number_of_allocations as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_stats_do_not_accumulate() {
        let stats = Stats::new(1024);
        stats.record_allocation(1024, 512);
        let snap = stats.snapshot(1024);
        assert_eq!(snap.tmd_average, 0);
    }

    #[test]
    fn enabled_after_first_snapshot() {
        let stats = Stats::new(1024);
        let _ = stats.snapshot(1024); // enables tracking
        stats.record_allocation(1024, 768);
        stats.record_deallocation();
        let snap = stats.snapshot(1024);
        assert_eq!(snap.tmd_max, 256);
        assert_eq!(snap.tmd_average, 256);
        assert_eq!(snap.tmd_alloc_rate, 1.0);
    }
}
