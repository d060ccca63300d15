//! Viewport to tile address enumeration.
//!
//! A [`VisibleRegion`] is an axis-aligned rectangle in Web Mercator world
//! space, where `0.0..1.0` spans the whole world on both axes at every zoom
//! level. [`enumerate_tiles`] turns a region and a zoom level into the grid
//! of tile addresses that must be on screen.

use crate::coord::{to_world_position, CoordError, TileAddress, MAX_ZOOM};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What to do with addresses that fall outside `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfBoundsPolicy {
    /// Drop addresses outside the pyramid.
    #[default]
    Clip,
    /// Keep them as-is; the coordinator normalizes them for fetching.
    Wrap,
}

impl fmt::Display for OutOfBoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutOfBoundsPolicy::Clip => write!(f, "clip"),
            OutOfBoundsPolicy::Wrap => write!(f, "wrap"),
        }
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown out-of-bounds policy '{0}' (expected 'clip' or 'wrap')")]
pub struct ParsePolicyError(pub String);

impl FromStr for OutOfBoundsPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clip" => Ok(OutOfBoundsPolicy::Clip),
            "wrap" => Ok(OutOfBoundsPolicy::Wrap),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Axis-aligned visible rectangle in world-fraction coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRegion {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl VisibleRegion {
    /// Creates a region from two opposite corners in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Builds a region from a pixel rectangle measured at `zoom`.
    ///
    /// At zoom `z` the world is `tile_size * 2^z` pixels wide, so pixel
    /// `(x, y)` maps to world position `(x, y) / (tile_size * 2^z)`.
    pub fn from_pixel_rect(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        zoom: u8,
        tile_size: u32,
    ) -> Self {
        let world_px = tile_size as f64 * TileAddress::tiles_per_side(zoom) as f64;
        Self::new(
            x / world_px,
            y / world_px,
            (x + width) / world_px,
            (y + height) / world_px,
        )
    }

    /// Builds a `width_px × height_px` screen region centered on a
    /// geographic point, as seen at `zoom`.
    pub fn around_lat_lon(
        lat: f64,
        lon: f64,
        zoom: u8,
        width_px: u32,
        height_px: u32,
        tile_size: u32,
    ) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let (cx, cy) = to_world_position(lat, lon)?;
        let world_px = tile_size as f64 * TileAddress::tiles_per_side(zoom) as f64;
        let half_w = width_px as f64 / 2.0 / world_px;
        let half_h = height_px as f64 / 2.0 / world_px;

        Ok(Self::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h))
    }

    /// Returns `true` if every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// Inclusive `(min_row, max_row, min_col, max_col)` grid at `zoom`,
    /// intersected with the cell window `[lo, hi]` on both axes.
    ///
    /// Returns `None` if the region misses the window.
    fn grid_bounds(&self, zoom: u8, lo: i64, hi: i64) -> Option<(i64, i64, i64, i64)> {
        let n = TileAddress::tiles_per_side(zoom) as f64;
        let axis = |a: f64, b: f64| -> Option<(i64, i64)> {
            let first = (a.min(b) * n).floor();
            let last = (a.max(b) * n).floor();
            if last < lo as f64 || first > hi as f64 {
                return None;
            }
            // Both ends lie within [lo, hi] after clamping, so the casts are exact
            Some((first.max(lo as f64) as i64, last.min(hi as f64) as i64))
        };

        let (min_row, max_row) = axis(self.min_y, self.max_y)?;
        let (min_col, max_col) = axis(self.min_x, self.max_x)?;
        Some((min_row, max_row, min_col, max_col))
    }
}

/// Most addresses a single region may enumerate to.
pub const MAX_REGION_TILES: u64 = 1 << 16;

/// Enumerates every tile address covering `region` at `zoom`.
///
/// Under [`OutOfBoundsPolicy::Clip`] addresses outside the pyramid are
/// dropped. Under [`OutOfBoundsPolicy::Wrap`] they are returned unchanged,
/// limited to one world copy on either side of the pyramid. The result is
/// unordered and a non-finite region yields nothing. Regions covering more
/// than [`MAX_REGION_TILES`] addresses are rejected.
pub fn enumerate_tiles(
    region: &VisibleRegion,
    zoom: u8,
    policy: OutOfBoundsPolicy,
) -> Result<Vec<TileAddress>, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if !region.is_finite() {
        return Ok(Vec::new());
    }

    let n = TileAddress::tiles_per_side(zoom);
    let (lo, hi) = match policy {
        OutOfBoundsPolicy::Clip => (0, n - 1),
        OutOfBoundsPolicy::Wrap => (-n, 2 * n - 1),
    };
    let Some((min_row, max_row, min_col, max_col)) = region.grid_bounds(zoom, lo, hi) else {
        return Ok(Vec::new());
    };

    let rows = max_row.abs_diff(min_row) + 1;
    let cols = max_col.abs_diff(min_col) + 1;
    let tiles = rows.checked_mul(cols).unwrap_or(u64::MAX);
    if tiles > MAX_REGION_TILES {
        return Err(CoordError::RegionTooLarge {
            tiles,
            limit: MAX_REGION_TILES,
        });
    }

    let mut addresses = Vec::with_capacity(tiles as usize);
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            addresses.push(TileAddress::new(zoom, row, col));
        }
    }

    Ok(addresses)
}
