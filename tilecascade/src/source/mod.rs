//! Tile sources.
//!
//! A [`TileSource`] is the one external dependency of the engine: an async
//! `fetch(zoom, row, col)` supplied by the embedding application. This
//! module defines the trait, a closure adapter, and an HTTP implementation
//! for URL-template tile servers.

mod http;
mod types;

pub use http::{HttpTileSource, DEFAULT_USER_AGENT};
pub use types::{FnTileSource, SourceError, TileSource};
