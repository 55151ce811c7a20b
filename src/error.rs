//! Error taxonomy for the allocator and its construction path.
//!
//! The allocator keeps a single-slot error register (`last_error`) rather
//! than returning a `Result` from `allocate`/`deallocate`, mirroring the
//! external "result" error domain this crate was designed to plug into:
//! exhaustion is reported as a bare `None`/`false` with the register left at
//! `NoError`, while corruption sets the register and still returns
//! `None`/`false`. See `SPEC_FULL.md` §7 for the full propagation policy.

use thiserror::Error;

/// The five error codes the allocator can surface.
///
/// `NoError` is the cleared/default state. `BaseAddressVoid` and
/// `SizeIsZero` are raised only by construction, never by `allocate` or
/// `deallocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[repr(i32)]
pub enum ErrorCode {
    /// No error set since the last public call.
    #[error("no error")]
    NoError = 0,
    /// Construction error: the supplied base pointer was null or misaligned.
    #[error("base address is null")]
    BaseAddressVoid = 1,
    /// A block header's alignment check failed, its embedded list-entry
    /// index was out of range, or its length would carry the drain past the
    /// end of the buffer.
    #[error("corrupted buffer block detected, integrity check failed")]
    CorruptedBufferBlock = 2,
    /// A computed list-entry index fell outside the ring's bounds.
    #[error("invalid list entry offset, out of bounds access prevented")]
    InvalidListEntryOffset = 3,
    /// Construction error: the supplied size was zero.
    #[error("size is zero")]
    SizeIsZero = 4,
}

impl ErrorCode {
    fn from_raw(raw: i32) -> Self {
        match raw {
            1 => ErrorCode::BaseAddressVoid,
            2 => ErrorCode::CorruptedBufferBlock,
            3 => ErrorCode::InvalidListEntryOffset,
            4 => ErrorCode::SizeIsZero,
            _ => ErrorCode::NoError,
        }
    }

    pub(crate) fn into_raw(self) -> i32 {
        self as i32
    }
}

/// A single-slot, cleared-on-entry error register.
///
/// Cleared at the start of every public `allocate`/`deallocate` call (see
/// `SPEC_FULL.md` §7); `stats_snapshot` and the plain accessors
/// (`available`, `base`, `size`) never touch it, preserving the source's
/// observable behavior rather than "fixing" the asymmetry.
pub(crate) struct ErrorRegister {
    code: std::sync::atomic::AtomicI32,
}

impl ErrorRegister {
    pub(crate) fn new() -> Self {
        Self {
            code: std::sync::atomic::AtomicI32::new(0),
        }
    }

    pub(crate) fn clear(&self) {
        self.code.store(0, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn set(&self, code: ErrorCode) {
        self.code
            .store(code.into_raw(), std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn get(&self) -> ErrorCode {
        ErrorCode::from_raw(self.code.load(std::sync::atomic::Ordering::SeqCst))
    }
}

/// Error returned by the allocator's constructor.
///
/// This plays the role of the original design's external allocator factory:
/// validating the base address and size before any allocator state exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The base pointer was null, or not aligned to the block header.
    #[error("base address is null or insufficiently aligned")]
    BaseAddressVoid,
    /// The requested size was zero, or did not fit in a `u32`.
    #[error("size is zero or exceeds u32::MAX")]
    SizeIsZero,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_clears_and_round_trips() {
        let reg = ErrorRegister::new();
        assert_eq!(reg.get(), ErrorCode::NoError);
        reg.set(ErrorCode::CorruptedBufferBlock);
        assert_eq!(reg.get(), ErrorCode::CorruptedBufferBlock);
        reg.clear();
        assert_eq!(reg.get(), ErrorCode::NoError);
    }
}
