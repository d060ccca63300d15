//! Engine configuration.

use super::defaults::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CACHE_TILES, DEFAULT_MAX_TRIES};
use crate::viewport::OutOfBoundsPolicy;
use std::time::Duration;

/// Configuration for a [`TileEngine`](crate::engine::TileEngine).
///
/// # Example
///
/// ```
/// use tilecascade::config::EngineConfig;
/// use tilecascade::viewport::OutOfBoundsPolicy;
/// use std::time::Duration;
///
/// let config = EngineConfig::new()
///     .with_max_cache_tiles(512)
///     .with_max_tries(2)
///     .with_fetch_timeout(Some(Duration::from_secs(5)))
///     .with_out_of_bounds(OutOfBoundsPolicy::Wrap);
///
/// assert_eq!(config.max_cache_tiles(), 512);
/// assert_eq!(config.max_tries(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of cached tiles (0 disables caching)
    max_cache_tiles: usize,
    /// Source calls per tile before the fetch is reported as failed
    max_tries: u32,
    /// Per-attempt timeout; `None` waits forever
    fetch_timeout: Option<Duration>,
    /// Cap on simultaneously running fetches; `None` is unbounded
    max_concurrent_fetches: Option<usize>,
    /// Edge policy for region enumeration
    out_of_bounds: OutOfBoundsPolicy,
}

impl EngineConfig {
    /// Create a new engine configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache capacity in tiles.
    ///
    /// Tiles are evicted oldest-first once the cache is full.
    /// Default: 256 tiles.
    pub fn with_max_cache_tiles(mut self, max_tiles: usize) -> Self {
        self.max_cache_tiles = max_tiles;
        self
    }

    /// Set how many times a tile source is called for one fetch.
    ///
    /// Retries are immediate. A value of 0 is treated as 1.
    /// Default: 3.
    pub fn with_max_tries(mut self, tries: u32) -> Self {
        self.max_tries = tries.max(1);
        self
    }

    /// Set the per-attempt timeout.
    ///
    /// An attempt that exceeds it counts as a failed attempt.
    /// Default: 10 seconds.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Cap the number of fetches calling the source at once.
    ///
    /// Deduplication is unaffected: there is still at most one fetch per
    /// address. A value of `Some(0)` is treated as `Some(1)`.
    /// Default: unbounded.
    pub fn with_max_concurrent_fetches(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_fetches = limit.map(|n| n.max(1));
        self
    }

    /// Set the edge policy used by region rendering.
    /// Default: clip.
    pub fn with_out_of_bounds(mut self, policy: OutOfBoundsPolicy) -> Self {
        self.out_of_bounds = policy;
        self
    }

    pub fn max_cache_tiles(&self) -> usize {
        self.max_cache_tiles
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    pub fn max_concurrent_fetches(&self) -> Option<usize> {
        self.max_concurrent_fetches
    }

    pub fn out_of_bounds(&self) -> OutOfBoundsPolicy {
        self.out_of_bounds
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cache_tiles: DEFAULT_MAX_CACHE_TILES,
            max_tries: DEFAULT_MAX_TRIES,
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
            max_concurrent_fetches: None,
            out_of_bounds: OutOfBoundsPolicy::Clip,
        }
    }
}
