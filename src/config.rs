//! Cache configuration.

use std::time::Duration;

/// How long a parked entry survives before a sweep may evict it.
pub const DEFAULT_EVICTION_WINDOW: Duration = Duration::from_secs(2);

/// Settings fixed at cache construction.
///
/// ```
/// use resource_cache::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::new(Duration::from_millis(500)).with_capacity(64);
/// assert_eq!(config.eviction_window, Duration::from_millis(500));
/// assert_eq!(config.capacity, 64);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CacheConfig {
    /// Minimum time an entry stays parked before it becomes evictable.
    /// A zero window evicts parked entries on the next sweep.
    pub eviction_window: Duration,
    /// Initial capacity hint for the entry table.
    pub capacity: usize,
}

impl CacheConfig {
    pub fn new(eviction_window: Duration) -> Self {
        Self {
            eviction_window,
            capacity: 0,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EVICTION_WINDOW)
    }
}
