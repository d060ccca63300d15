//! Default values and constants for all configuration settings.

use std::time::Duration;

// =============================================================================
// Cache defaults
// =============================================================================

/// Default number of tiles kept in the cache.
pub const DEFAULT_MAX_CACHE_TILES: usize = 256;

// =============================================================================
// Fetch defaults
// =============================================================================

/// Default number of source calls per tile before giving up.
pub const DEFAULT_MAX_TRIES: u32 = 3;

/// Default per-attempt timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default per-attempt timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS);

// =============================================================================
// Viewport defaults
// =============================================================================

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilecascade.log";
