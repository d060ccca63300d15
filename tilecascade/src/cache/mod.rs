//! Bounded in-memory tile cache.
//!
//! Keeps the most recently produced tiles up to a fixed count and evicts in
//! insertion order (FIFO). Lookups do not refresh an entry's position.

mod fifo;
mod stats;

pub use fifo::TileCache;
pub use stats::CacheStats;
