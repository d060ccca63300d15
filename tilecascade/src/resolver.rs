//! Active-set resolution with multi-resolution fallback.
//!
//! Given the addresses a view needs, the tiles drawn last time and the
//! cache, [`resolve`] picks what to draw right now:
//!
//! 1. exact matches, looked up in the previous snapshot first, then the cache;
//! 2. for each missing address, the closest cached ancestor (scanning from
//!    `zoom - 1` down to `0`);
//! 3. failing that, every available descendant of the missing address;
//! 4. descendants already covered by a chosen ancestor are dropped.
//!
//! The result is sorted coarsest first. Missing addresses are reported back
//! so the coordinator can dispatch fetches for them.

use crate::active::ActiveTiles;
use crate::cache::TileCache;
use crate::coord::TileAddress;
use crate::tile::Tile;
use std::collections::{HashMap, HashSet};

/// Outcome of one resolver pass.
#[derive(Debug)]
pub struct Resolution<C> {
    /// The new snapshot to publish
    pub active: ActiveTiles<C>,
    /// Normalized required addresses with no exact tile available
    pub missing: Vec<TileAddress>,
}

/// Computes the renderable tile set for `required` at `zoom`.
///
/// `required` may contain raw, out-of-range addresses; they are normalized
/// for lookup. Duplicates after normalization are resolved once. Exact
/// lookups that reach the cache are recorded as cache hits or misses.
pub fn resolve<C>(
    required: &[TileAddress],
    zoom: u8,
    previous: &ActiveTiles<C>,
    cache: &TileCache<C>,
) -> Resolution<C> {
    resolve_with(required, zoom, previous, cache, true)
}

/// Same as [`resolve`] but leaves the cache hit/miss counters untouched.
///
/// Used to redraw an unchanged view after a fetch completes.
pub fn refresh<C>(
    required: &[TileAddress],
    zoom: u8,
    previous: &ActiveTiles<C>,
    cache: &TileCache<C>,
) -> Resolution<C> {
    resolve_with(required, zoom, previous, cache, false)
}

fn resolve_with<C>(
    required: &[TileAddress],
    zoom: u8,
    previous: &ActiveTiles<C>,
    cache: &TileCache<C>,
    count_lookups: bool,
) -> Resolution<C> {
    let previous_index: HashMap<TileAddress, &Tile<C>> = previous
        .tiles()
        .iter()
        .map(|t| (t.address(), t))
        .collect();

    let mut seen = HashSet::with_capacity(required.len());
    let mut exact: Vec<Tile<C>> = Vec::new();
    let mut missing: Vec<TileAddress> = Vec::new();

    for address in required.iter().map(TileAddress::normalized) {
        if !seen.insert(address) {
            continue;
        }
        let found = previous_index.get(&address).copied().or_else(|| {
            if count_lookups {
                cache.get(&address)
            } else {
                cache.peek(&address)
            }
        });
        match found {
            Some(tile) => exact.push(tile.clone()),
            None => missing.push(address),
        }
    }

    if missing.is_empty() {
        return Resolution {
            active: ActiveTiles::new(zoom, exact),
            missing,
        };
    }

    // Everything we could draw: previous snapshot plus cache, deduplicated
    let mut pool: HashMap<TileAddress, &Tile<C>> = previous_index;
    for tile in cache.iter() {
        pool.entry(tile.address()).or_insert(tile);
    }

    let mut parents: HashMap<TileAddress, Tile<C>> = HashMap::new();
    let mut children: HashMap<TileAddress, Tile<C>> = HashMap::new();

    for address in &missing {
        let ancestor = (0..address.zoom)
            .rev()
            .filter_map(|z| address.ancestor_at(z))
            .find_map(|a| pool.get(&a));

        match ancestor {
            Some(tile) => {
                parents
                    .entry(tile.address())
                    .or_insert_with(|| (*tile).clone());
            }
            None => {
                for tile in pool.values() {
                    if tile.address().is_descendant_of(address) {
                        children
                            .entry(tile.address())
                            .or_insert_with(|| (*tile).clone());
                    }
                }
            }
        }
    }

    children.retain(|child, _| !parents.keys().any(|p| p.covers(child)));

    let mut placed: HashSet<TileAddress> = exact.iter().map(Tile::address).collect();
    let mut tiles = exact;
    for tile in parents.into_values().chain(children.into_values()) {
        if placed.insert(tile.address()) {
            tiles.push(tile);
        }
    }

    tracing::trace!(
        zoom,
        required = required.len(),
        missing = missing.len(),
        active = tiles.len(),
        "Resolved active tile set"
    );

    Resolution {
        active: ActiveTiles::new(zoom, tiles),
        missing,
    }
}
