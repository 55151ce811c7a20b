//! A lock-free, multi-producer / multi-consumer circular memory allocator.
//!
//! Producers reserve variable-sized, aligned regions from a caller-supplied
//! contiguous buffer; consumers release them in any order, and space is
//! reclaimed as soon as the oldest outstanding region is freed. No mutex is
//! involved anywhere on the hot path — every shared field is an atomic cell
//! (see [`atomics`]), and every retry loop is bounded.
//!
//! ```no_run
//! use ringalloc::{Config, RingAllocator};
//!
//! let mut buf = vec![0u8; 4096];
//! let allocator = unsafe { RingAllocator::new(buf.as_mut_ptr(), buf.len(), Config::default()) }
//!     .expect("valid base/size");
//!
//! let ptr = allocator.allocate(64, None).expect("buffer has room");
//! unsafe { allocator.deallocate(ptr) };
//! ```

mod alloc_engine;
mod allocator;
mod atomics;
mod backoff;
mod config;
mod dealloc_engine;
mod error;
mod header;
mod invariants;
mod layout;
mod list_ring;
mod stats;

pub use allocator::RingAllocator;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_CONTENTION_CONFIG};
pub use error::{ConstructionError, ErrorCode};
pub use stats::Telemetry;

/// Upper bound on attempts for every bounded compare-exchange retry loop in
/// the allocation and deallocation engines. Exhaustion is a non-error: the
/// single call fails (null/false), not the allocator.
pub(crate) const MAX_RETRIES: u32 = 200;

/// Sentinel value for `gap_address` meaning "no wrap gap pending".
pub(crate) const GAP_SENTINEL: u32 = u32::MAX;
