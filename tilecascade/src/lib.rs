//! TileCascade - multi-resolution map tile engine
//!
//! This library keeps a map view populated while tiles stream in. An
//! application tells the engine which tile addresses the current viewport
//! needs; the engine fetches the missing ones from an injected
//! [`TileSource`](source::TileSource), keeps recent tiles in a bounded cache,
//! and publishes an [`ActiveTiles`](active::ActiveTiles) snapshot in which
//! every missing tile is stood in for by a cached ancestor or descendant.
//!
//! # High-Level API
//!
//! ```ignore
//! use tilecascade::{EngineConfig, TileEngine, HttpTileSource, VisibleRegion};
//!
//! let source = HttpTileSource::new("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?;
//! let engine = TileEngine::spawn(EngineConfig::default(), source);
//!
//! let region = VisibleRegion::around_lat_lon(51.5074, -0.1278, 12, 1280, 720, 256)?;
//! engine.render_region(&region, 12)?;
//!
//! let mut updates = engine.subscribe();
//! while updates.changed().await.is_ok() {
//!     redraw(&updates.borrow());
//! }
//! ```

pub mod active;
pub mod cache;
pub mod config;
pub mod coord;
mod coordinator;
pub mod engine;
pub mod fetch;
pub mod logging;
pub mod resolver;
pub mod source;
pub mod tile;
pub mod viewport;

pub use active::{ActiveTiles, Composition, PlacedTile, TilePlacement};
pub use config::EngineConfig;
pub use coord::TileAddress;
pub use engine::{EngineError, EngineStats, TileEngine};
pub use source::{FnTileSource, HttpTileSource, SourceError, TileSource};
pub use tile::Tile;
pub use viewport::{OutOfBoundsPolicy, VisibleRegion};

/// Version of the TileCascade library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
