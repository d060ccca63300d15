//! The renderable tile set handed to the presentation layer.

use crate::coord::TileAddress;
use crate::tile::Tile;
use std::collections::HashSet;
use std::fmt;

/// Snapshot of the tiles to draw for the current view.
///
/// Tiles are sorted ascending by zoom (coarsest first) so painting them in
/// order layers finer substitutes over coarser ones. A snapshot is never
/// mutated after publication; the engine replaces it wholesale.
pub struct ActiveTiles<C> {
    current_zoom: u8,
    tiles: Vec<Tile<C>>,
}

impl<C> ActiveTiles<C> {
    /// Builds a snapshot, sorting tiles coarsest first.
    ///
    /// Ties are broken by row then column so the order is deterministic.
    pub fn new(current_zoom: u8, mut tiles: Vec<Tile<C>>) -> Self {
        tiles.sort_by_key(|t| t.address());
        Self {
            current_zoom,
            tiles,
        }
    }

    /// The snapshot published before the first render request.
    pub fn empty() -> Self {
        Self {
            current_zoom: 0,
            tiles: Vec::new(),
        }
    }

    /// Zoom level the view was requested at.
    pub fn current_zoom(&self) -> u8 {
        self.current_zoom
    }

    pub fn tiles(&self) -> &[Tile<C>] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Finds the tile stored under exactly this (normalized) address.
    pub fn get(&self, address: &TileAddress) -> Option<&Tile<C>> {
        let address = address.normalized();
        self.tiles.iter().find(|t| t.address() == address)
    }

    pub fn contains(&self, address: &TileAddress) -> bool {
        self.get(address).is_some()
    }

    /// Positions every tile for a view built from `required`.
    ///
    /// Tiles are stored under normalized addresses, while `required` may
    /// hold raw addresses past the edge of the world. Each tile is placed
    /// once for every world copy of the required addresses it stands in
    /// for, so a tile fetched for `col = -1` is drawn left of column 0
    /// rather than at the far right. Tiles unrelated to `required` are
    /// placed at their own address. Output follows snapshot order.
    pub fn placements(
        &self,
        required: &[TileAddress],
        tile_size: u32,
        origin: (f64, f64),
    ) -> Vec<PlacedTile<'_, C>> {
        // Normalized address -> world copies it is required in
        let mut copies: Vec<(TileAddress, (i64, i64))> = Vec::new();
        let mut seen = HashSet::new();
        for raw in required {
            let entry = (raw.normalized(), world_copy(raw));
            if seen.insert(entry) {
                copies.push(entry);
            }
        }

        let mut placed = HashSet::new();
        let mut result = Vec::new();
        for tile in &self.tiles {
            let address = tile.address();
            let mut shifts: Vec<(i64, i64)> = copies
                .iter()
                .filter(|(wanted, _)| address.covers(wanted) || wanted.covers(&address))
                .map(|&(_, copy)| copy)
                .collect();
            if shifts.is_empty() {
                shifts.push((0, 0));
            }

            for (world_row, world_col) in shifts {
                let Some(shown) = shift_by_worlds(address, world_row, world_col) else {
                    continue;
                };
                if placed.insert(shown) {
                    result.push(PlacedTile {
                        address: shown,
                        tile,
                        placement: TilePlacement::for_address(
                            &shown,
                            self.current_zoom,
                            tile_size,
                            origin,
                        ),
                    });
                }
            }
        }
        result
    }

    /// Counts tiles coarser than, equal to and finer than the current zoom.
    pub fn composition(&self) -> Composition {
        let mut composition = Composition::default();
        for tile in &self.tiles {
            match tile.zoom().cmp(&self.current_zoom) {
                std::cmp::Ordering::Less => composition.ancestors += 1,
                std::cmp::Ordering::Equal => composition.exact += 1,
                std::cmp::Ordering::Greater => composition.descendants += 1,
            }
        }
        composition
    }
}

impl<C> Default for ActiveTiles<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C> fmt::Debug for ActiveTiles<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTiles")
            .field("current_zoom", &self.current_zoom)
            .field("tiles", &self.tiles)
            .finish()
    }
}

/// How an [`ActiveTiles`] snapshot breaks down by substitution kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Composition {
    /// Tiles at the requested zoom
    pub exact: usize,
    /// Coarser placeholder tiles
    pub ancestors: usize,
    /// Finer placeholder tiles
    pub descendants: usize,
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exact, {} ancestor, {} descendant",
            self.exact, self.ancestors, self.descendants
        )
    }
}

/// Screen placement of a tile drawn at a zoom other than its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    /// Left edge in pixels
    pub x: f64,
    /// Top edge in pixels
    pub y: f64,
    /// Edge length in pixels
    pub size: f64,
    /// `2^(current_zoom - tile.zoom)`
    pub scale: f64,
}

impl TilePlacement {
    /// Positions `address` for a view rendered at `current_zoom`.
    ///
    /// `x = col * tile_size * scale + origin.0`, likewise for `y`, where the
    /// scale is fractional for tiles finer than the current zoom.
    pub fn for_address(
        address: &TileAddress,
        current_zoom: u8,
        tile_size: u32,
        origin: (f64, f64),
    ) -> Self {
        let scale = 2f64.powi(current_zoom as i32 - address.zoom as i32);
        let size = tile_size as f64 * scale;
        Self {
            x: address.col as f64 * size + origin.0,
            y: address.row as f64 * size + origin.1,
            size,
            scale,
        }
    }

    pub fn for_tile<C>(tile: &Tile<C>, current_zoom: u8, tile_size: u32, origin: (f64, f64)) -> Self {
        Self::for_address(&tile.address(), current_zoom, tile_size, origin)
    }
}

/// A tile together with the on-screen position of one of its copies.
#[derive(Debug)]
pub struct PlacedTile<'a, C> {
    /// Raw address the tile is drawn at
    pub address: TileAddress,
    pub tile: &'a Tile<C>,
    pub placement: TilePlacement,
}

/// Which copy of the world a raw address falls in, as `(row, col)` offsets.
fn world_copy(address: &TileAddress) -> (i64, i64) {
    let n = TileAddress::tiles_per_side(address.zoom);
    (address.row.div_euclid(n), address.col.div_euclid(n))
}

/// Moves `address` by whole worlds. `None` on overflow.
fn shift_by_worlds(address: TileAddress, world_row: i64, world_col: i64) -> Option<TileAddress> {
    let n = TileAddress::tiles_per_side(address.zoom);
    let row = address.row.checked_add(world_row.checked_mul(n)?)?;
    let col = address.col.checked_add(world_col.checked_mul(n)?)?;
    Some(TileAddress::new(address.zoom, row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(zoom: u8, row: i64, col: i64) -> Tile<()> {
        Tile::new(TileAddress::new(zoom, row, col), ())
    }

    #[test]
    fn test_sorted_coarsest_first() {
        let active = ActiveTiles::new(5, vec![tile(6, 0, 0), tile(4, 1, 1), tile(5, 3, 3)]);
        let zooms: Vec<u8> = active.tiles().iter().map(|t| t.zoom()).collect();
        assert_eq!(zooms, vec![4, 5, 6]);
    }

    #[test]
    fn test_composition() {
        let active = ActiveTiles::new(
            5,
            vec![tile(4, 1, 1), tile(5, 0, 0), tile(5, 0, 1), tile(6, 0, 4)],
        );
        assert_eq!(
            active.composition(),
            Composition {
                exact: 2,
                ancestors: 1,
                descendants: 1
            }
        );
        assert_eq!(
            active.composition().to_string(),
            "2 exact, 1 ancestor, 1 descendant"
        );
    }

    #[test]
    fn test_lookup_normalizes() {
        let active = ActiveTiles::new(2, vec![tile(2, 0, 3)]);
        assert!(active.contains(&TileAddress::new(2, 0, -1)));
        assert!(!active.contains(&TileAddress::new(2, 0, 2)));
    }

    #[test]
    fn test_empty_snapshot() {
        let active: ActiveTiles<()> = ActiveTiles::default();
        assert!(active.is_empty());
        assert_eq!(active.current_zoom(), 0);
    }

    #[test]
    fn test_placement_exact_tile() {
        let p = TilePlacement::for_address(&TileAddress::new(3, 2, 5), 3, 256, (10.0, -20.0));
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.x, 5.0 * 256.0 + 10.0);
        assert_eq!(p.y, 2.0 * 256.0 - 20.0);
        assert_eq!(p.size, 256.0);
    }

    #[test]
    fn test_placement_ancestor_is_upscaled() {
        // (4,1,1) drawn in a zoom-5 view covers rows/cols 2..4
        let p = TilePlacement::for_address(&TileAddress::new(4, 1, 1), 5, 256, (0.0, 0.0));
        assert_eq!(p.scale, 2.0);
        assert_eq!(p.size, 512.0);
        assert_eq!(p.x, 512.0);
    }

    #[test]
    fn test_placement_descendant_is_downscaled() {
        let p = TilePlacement::for_tile(&tile(6, 7, 7), 5, 256, (0.0, 0.0));
        assert_eq!(p.scale, 0.5);
        assert_eq!(p.x, 7.0 * 128.0);
    }

    fn shown(placed: &[PlacedTile<'_, ()>]) -> Vec<(TileAddress, f64)> {
        placed.iter().map(|p| (p.address, p.placement.x)).collect()
    }

    #[test]
    fn test_placements_follow_wrapped_addresses() {
        // View straddling the antimeridian at zoom 2, origin 0.1 world left
        let active = ActiveTiles::new(2, vec![tile(2, 1, 0), tile(2, 1, 3)]);
        let required = [TileAddress::new(2, 1, -1), TileAddress::new(2, 1, 0)];

        let placed = active.placements(&required, 256, (102.4, 0.0));

        let mut got = shown(&placed);
        got.sort_by_key(|(a, _)| *a);
        assert_eq!(
            got,
            vec![
                (TileAddress::new(2, 1, -1), -256.0 + 102.4),
                (TileAddress::new(2, 1, 0), 102.4)
            ]
        );
        let wrapped = placed.iter().find(|p| p.address.col == -1).unwrap();
        assert_eq!(wrapped.tile.address(), TileAddress::new(2, 1, 3));
    }

    #[test]
    fn test_placements_shift_ancestor_with_required_copy() {
        // (1,0,1) stands in for the wrapped (2,1,-1) = (2,1,3)
        let active = ActiveTiles::new(2, vec![tile(1, 0, 1)]);
        let placed = active.placements(&[TileAddress::new(2, 1, -1)], 256, (0.0, 0.0));

        assert_eq!(shown(&placed), vec![(TileAddress::new(1, 0, -1), -512.0)]);
        assert_eq!(placed[0].placement.scale, 2.0);
    }

    #[test]
    fn test_placements_same_tile_in_two_copies() {
        // A view wider than the world needs column 0 twice
        let active = ActiveTiles::new(1, vec![tile(1, 0, 0)]);
        let required = [TileAddress::new(1, 0, 0), TileAddress::new(1, 0, 2)];

        let placed = active.placements(&required, 256, (0.0, 0.0));

        assert_eq!(
            shown(&placed),
            vec![(TileAddress::new(1, 0, 0), 0.0), (TileAddress::new(1, 0, 2), 512.0)]
        );
    }

    #[test]
    fn test_unrelated_tile_placed_at_own_address() {
        let active = ActiveTiles::new(3, vec![tile(3, 4, 4)]);
        let placed = active.placements(&[TileAddress::new(3, 0, 0)], 256, (0.0, 0.0));

        assert_eq!(shown(&placed), vec![(TileAddress::new(3, 4, 4), 1024.0)]);
    }
}
