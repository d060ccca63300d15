//! FIFO tile store with a fixed entry count.

use crate::cache::CacheStats;
use crate::coord::TileAddress;
use crate::tile::Tile;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};

/// Fixed-capacity tile cache with insertion-order eviction.
///
/// Owned by the engine coordinator; it is never shared between tasks, so
/// plain collections suffice. Hit/miss counters use `Cell` so that lookups
/// can stay `&self`.
pub struct TileCache<C> {
    /// Stored tiles keyed by normalized address
    tiles: HashMap<TileAddress, Tile<C>>,
    /// Insertion order, oldest at the front
    order: VecDeque<TileAddress>,
    /// Maximum number of tiles; 0 disables caching
    max_tiles: usize,
    inserts: u64,
    evictions: u64,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<C> TileCache<C> {
    /// Create a new cache holding at most `max_tiles` tiles.
    pub fn new(max_tiles: usize) -> Self {
        Self {
            tiles: HashMap::with_capacity(max_tiles),
            order: VecDeque::with_capacity(max_tiles),
            max_tiles,
            inserts: 0,
            evictions: 0,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Store a tile, evicting the oldest entry if the cache is full.
    ///
    /// Returns the evicted tile, if any. With a capacity of 0 the tile is
    /// handed straight back. Re-inserting an address already present
    /// replaces it and moves it to the newest position.
    pub fn insert(&mut self, tile: Tile<C>) -> Option<Tile<C>> {
        if self.max_tiles == 0 {
            return Some(tile);
        }

        let address = tile.address().normalized();
        if self.tiles.insert(address, tile).is_some() {
            self.order.retain(|a| *a != address);
        }
        self.order.push_back(address);
        self.inserts += 1;

        if self.order.len() > self.max_tiles {
            let oldest = self.order.pop_front()?;
            self.evictions += 1;
            tracing::trace!(tile = %oldest, "Cache eviction");
            return self.tiles.remove(&oldest);
        }
        None
    }

    /// Look up a tile by address (normalized before lookup).
    pub fn get(&self, address: &TileAddress) -> Option<&Tile<C>> {
        let found = self.tiles.get(&address.normalized());
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.set(counter.get() + 1);
        found
    }

    /// Look up a tile without touching statistics.
    pub fn peek(&self, address: &TileAddress) -> Option<&Tile<C>> {
        self.tiles.get(&address.normalized())
    }

    /// Check if an address is cached without touching statistics.
    pub fn contains(&self, address: &TileAddress) -> bool {
        self.tiles.contains_key(&address.normalized())
    }

    /// Iterate tiles from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Tile<C>> + '_ {
        self.order.iter().filter_map(|a| self.tiles.get(a))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_tiles
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.max_tiles,
            inserts: self.inserts,
            evictions: self.evictions,
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}
