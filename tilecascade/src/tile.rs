//! Materialized tiles.

use crate::coord::TileAddress;
use std::fmt;
use std::sync::Arc;

/// A fetched tile: its normalized address and the opaque payload the
/// tile source produced for it.
///
/// Tiles are immutable. Content sits behind an `Arc`, so cloning a tile
/// into the cache and into an `ActiveTiles` snapshot shares one payload.
pub struct Tile<C> {
    address: TileAddress,
    content: Arc<C>,
}

impl<C> Tile<C> {
    /// Creates a tile from an address and its content.
    pub fn new(address: TileAddress, content: C) -> Self {
        Self::from_shared(address, Arc::new(content))
    }

    /// Creates a tile around already-shared content.
    pub fn from_shared(address: TileAddress, content: Arc<C>) -> Self {
        Self { address, content }
    }

    #[inline]
    pub fn address(&self) -> TileAddress {
        self.address
    }

    #[inline]
    pub fn zoom(&self) -> u8 {
        self.address.zoom
    }

    #[inline]
    pub fn content(&self) -> &C {
        &self.content
    }

    /// Shared handle to the content.
    pub fn shared_content(&self) -> Arc<C> {
        Arc::clone(&self.content)
    }
}

// Manual impl: `C` itself need not be `Clone`.
impl<C> Clone for Tile<C> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            content: Arc::clone(&self.content),
        }
    }
}

impl<C> fmt::Debug for Tile<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_content() {
        let tile = Tile::new(TileAddress::new(3, 1, 2), vec![1u8, 2, 3]);
        let copy = tile.clone();
        assert!(Arc::ptr_eq(&tile.shared_content(), &copy.shared_content()));
        assert_eq!(copy.address(), TileAddress::new(3, 1, 2));
        assert_eq!(copy.zoom(), 3);
        assert_eq!(copy.content(), &vec![1u8, 2, 3]);
    }

    #[test]
    fn test_clone_without_clone_content() {
        struct Opaque;
        let tile = Tile::new(TileAddress::new(0, 0, 0), Opaque);
        let _copy = tile.clone();
    }

    #[test]
    fn test_debug_shows_address_only() {
        let tile = Tile::new(TileAddress::new(1, 0, 1), "payload");
        let debug = format!("{:?}", tile);
        assert!(debug.contains("address"));
        assert!(!debug.contains("payload"));
    }
}
