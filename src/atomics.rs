//! Atomic indirection layer.
//!
//! Every multi-word field the allocator shares across threads (`buffer_head`,
//! `buffer_tail`, `list_head`, `list_tail`, `gap_address`, `wrap_around`, and
//! every list-ring slot) is routed through one of the cell types here instead
//! of a bare `std::sync::atomic` type. In production the cell is a thin
//! wrapper with no overhead beyond the underlying atomic. Under
//! `#[cfg(test)]` (or the `test-util` feature) a cell can carry a
//! [`FaultInjector`] that forces a chosen number of `compare_exchange`
//! attempts to fail, which is how the bounded-retry paths (e.g. the
//! `list_head` CAS loop in the allocation engine) get deterministic coverage
//! of their retry-exhaustion branch (see `E6` in `SPEC_FULL.md`).
//!
//! All operations use `SeqCst`: the wrap-around race resolution depends on a
//! single global total order across `wrap_around`, `buffer_head`, and the
//! list ring, so anything weaker would be unsound here.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Forces a chosen number of `compare_exchange` attempts on a cell to fail,
/// regardless of whether the underlying CAS would otherwise have succeeded.
///
/// Used only by tests to exercise retry-exhaustion paths deterministically.
#[derive(Debug, Default)]
pub(crate) struct FaultInjector {
    remaining: AtomicUsize,
}

impl FaultInjector {
    pub(crate) fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(failures),
        })
    }

    /// Returns true if this attempt should be forced to fail, consuming one
    /// unit of the injected-failure budget.
    fn consume(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n == 0 {
                    None
                } else {
                    Some(n - 1)
                }
            })
            .is_ok()
    }
}

macro_rules! atomic_cell {
    ($name:ident, $atomic:ty, $val:ty) => {
        /// Atomic indirection cell — see module docs.
        pub(crate) struct $name {
            inner: $atomic,
            fault: Option<Arc<FaultInjector>>,
        }

        impl $name {
            pub(crate) fn new(value: $val) -> Self {
                assert!(
                    <$atomic>::is_lock_free(),
                    concat!(stringify!($atomic), " is not lock-free on this platform")
                );
                Self {
                    inner: <$atomic>::new(value),
                    fault: None,
                }
            }

            /// Same as [`Self::new`] but wired to fail a bounded number of
            /// `compare_exchange` attempts. Test-only.
            #[cfg(any(test, feature = "test-util"))]
            pub(crate) fn new_with_fault(value: $val, fault: Arc<FaultInjector>) -> Self {
                let mut cell = Self::new(value);
                cell.fault = Some(fault);
                cell
            }

            #[inline]
            pub(crate) fn load(&self) -> $val {
                self.inner.load(Ordering::SeqCst)
            }

            #[inline]
            pub(crate) fn store(&self, value: $val) {
                self.inner.store(value, Ordering::SeqCst);
            }

            #[inline]
            pub(crate) fn compare_exchange(
                &self,
                current: $val,
                new: $val,
            ) -> Result<$val, $val> {
                if let Some(fault) = &self.fault {
                    if fault.consume() {
                        return Err(self.inner.load(Ordering::SeqCst));
                    }
                }
                self.inner
                    .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            }
        }
    };
}

atomic_cell!(CellU32, AtomicU32, u32);
atomic_cell!(CellU64, AtomicU64, u64);
atomic_cell!(CellBool, AtomicBool, bool);

impl CellU32 {
    /// Unconditional seq-cst fetch-sub: unlike a CAS retry loop this always
    /// succeeds in one instruction, wrapping on underflow exactly as a
    /// hardware `fetch_sub` would. Used for the eager `available_size` debit,
    /// where a bounded-retry substitute would introduce a spurious failure
    /// mode the accounting protocol doesn't have.
    #[inline]
    pub(crate) fn fetch_sub(&self, value: u32) -> u32 {
        self.inner.fetch_sub(value, Ordering::SeqCst)
    }

    /// Unconditional seq-cst fetch-add, the credit-side counterpart to
    /// [`Self::fetch_sub`]. Used to refund `available_size` as the drain
    /// reclaims each contiguous freed block.
    #[inline]
    pub(crate) fn fetch_add(&self, value: u32) -> u32 {
        self.inner.fetch_add(value, Ordering::SeqCst)
    }
}

/// Retries a compare-exchange loop on a [`CellU32`], pacing failed attempts
/// with a [`crate::backoff::Backoff`], bounded by [`crate::MAX_RETRIES`].
/// `compute` derives the desired new value from the currently observed one;
/// it may be called more than once per call if other threads interleave.
pub(crate) fn retry_cas_u32(cell: &CellU32, mut compute: impl FnMut(u32) -> u32) -> Option<u32> {
    let mut backoff = crate::backoff::Backoff::new();
    for _ in 0..crate::MAX_RETRIES {
        let old = cell.load();
        let new = compute(old);
        if cell.compare_exchange(old, new).is_ok() {
            return Some(new);
        }
        backoff.spin();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_round_trips() {
        let c = CellU32::new(5);
        assert_eq!(c.load(), 5);
        assert_eq!(c.compare_exchange(5, 9), Ok(5));
        assert_eq!(c.load(), 9);
        assert_eq!(c.compare_exchange(5, 1), Err(9));
    }

    #[test]
    fn fetch_sub_returns_previous_value_and_wraps_on_underflow() {
        let c = CellU32::new(10);
        assert_eq!(c.fetch_sub(3), 10);
        assert_eq!(c.load(), 7);
        assert_eq!(c.fetch_sub(100), 7);
        assert_eq!(c.load(), 7u32.wrapping_sub(100));
    }

    #[test]
    fn fetch_add_returns_previous_value() {
        let c = CellU32::new(10);
        assert_eq!(c.fetch_add(5), 10);
        assert_eq!(c.load(), 15);
    }

    #[test]
    fn fault_injector_forces_failures_then_allows_success() {
        let fault = FaultInjector::new(2);
        let c = CellU32::new_with_fault(0, fault);
        assert_eq!(c.compare_exchange(0, 1), Err(0));
        assert_eq!(c.compare_exchange(0, 1), Err(0));
        assert_eq!(c.compare_exchange(0, 1), Ok(0));
        assert_eq!(c.load(), 1);
    }
}
