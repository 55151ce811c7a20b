//! Construction-time tunables for the allocator.

/// Configuration for [`crate::RingAllocator`].
///
/// Mirrors the shape of a construction-parameters struct: a `Copy` value
/// type with a validating `const fn` constructor, a sane `Default`, and
/// named presets for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Capacity `K` of the list-entry ring (number of slot descriptors).
    /// Index 0 is reserved as a sentinel, so at most `list_ring_capacity - 1`
    /// blocks can be outstanding at once.
    pub list_ring_capacity: usize,
    /// Whether peak/cumulative usage statistics are tracked from
    /// construction. `stats_snapshot` enables tracking regardless of this
    /// flag the first time it is called; this only controls whether
    /// tracking is already warm before the first snapshot.
    pub enable_stats: bool,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `list_ring_capacity` is less than 2 (index 0 is a sentinel,
    /// so at least one usable slot is required).
    #[must_use]
    pub const fn new(list_ring_capacity: usize, enable_stats: bool) -> Self {
        assert!(
            list_ring_capacity >= 2,
            "list_ring_capacity must be at least 2 (index 0 is a sentinel)"
        );
        Self {
            list_ring_capacity,
            enable_stats,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            list_ring_capacity: 4096,
            enable_stats: false,
        }
    }
}

/// Preset tuned for a small number of short-lived blocks.
pub const LOW_CONTENTION_CONFIG: Config = Config::new(512, false);

/// Preset tuned for heavy producer/consumer contention with many
/// outstanding blocks.
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(16384, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_usable() {
        let c = Config::default();
        assert!(c.list_ring_capacity >= 2);
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn rejects_too_small_capacity() {
        let _ = Config::new(1, false);
    }
}
