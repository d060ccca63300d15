//! Coordinate type definitions

use std::fmt;
use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels.
///
/// Capped so that `2^zoom` and the scale factors derived from zoom
/// differences always fit comfortably in an `i64`.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 30;

/// Address of a single tile in a power-of-two quad-tree pyramid.
///
/// Row and column are signed because viewport enumeration can produce
/// addresses just past the edge of the world (for example `col = -1` when
/// the view straddles the antimeridian). Such addresses are valid for
/// display placement; [`TileAddress::normalized`] maps them back into
/// `[0, 2^zoom)` for content identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Zoom level (0 = whole world in one tile)
    pub zoom: u8,
    /// Y coordinate (north-south), 0 at north
    pub row: i64,
    /// X coordinate (east-west), 0 at west
    pub col: i64,
}

impl TileAddress {
    /// Creates an address without range checks.
    #[inline]
    pub const fn new(zoom: u8, row: i64, col: i64) -> Self {
        Self { zoom, row, col }
    }

    /// Creates an address, rejecting zoom levels above [`MAX_ZOOM`].
    ///
    /// Row and column are not checked; out-of-range values are legal
    /// transient addresses.
    pub fn checked(zoom: u8, row: i64, col: i64) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        Ok(Self { zoom, row, col })
    }

    /// Number of tiles along one side of the pyramid at `zoom`.
    #[inline]
    pub fn tiles_per_side(zoom: u8) -> i64 {
        span(zoom)
    }

    /// Returns `true` if row and column both lie in `[0, 2^zoom)`.
    #[inline]
    pub fn is_in_range(&self) -> bool {
        let n = span(self.zoom);
        (0..n).contains(&self.row) && (0..n).contains(&self.col)
    }

    /// Wraps row and column into `[0, 2^zoom)`.
    ///
    /// Used to identify the underlying content of an address, never for
    /// display placement.
    #[inline]
    pub fn normalized(&self) -> Self {
        let n = span(self.zoom);
        Self {
            zoom: self.zoom,
            row: self.row.rem_euclid(n),
            col: self.col.rem_euclid(n),
        }
    }

    /// Returns the enclosing tile one level up, or `None` at zoom 0.
    #[inline]
    pub fn parent(&self) -> Option<Self> {
        self.zoom.checked_sub(1).and_then(|z| self.ancestor_at(z))
    }

    /// Returns the tile at `zoom` that contains this one.
    ///
    /// `None` unless `zoom` is strictly coarser than this address.
    pub fn ancestor_at(&self, zoom: u8) -> Option<Self> {
        if zoom >= self.zoom {
            return None;
        }
        let s = span(self.zoom - zoom);
        Some(Self {
            zoom,
            row: self.row.div_euclid(s),
            col: self.col.div_euclid(s),
        })
    }

    /// The four tiles one level down, in row-major order.
    pub fn children(&self) -> [Self; 4] {
        let zoom = self.zoom + 1;
        let (row, col) = (self.row * 2, self.col * 2);
        [
            Self::new(zoom, row, col),
            Self::new(zoom, row, col + 1),
            Self::new(zoom, row + 1, col),
            Self::new(zoom, row + 1, col + 1),
        ]
    }

    /// Returns `true` if this tile strictly contains `other`.
    #[inline]
    pub fn is_ancestor_of(&self, other: &TileAddress) -> bool {
        other.ancestor_at(self.zoom) == Some(*self)
    }

    /// Returns `true` if `other` strictly contains this tile.
    #[inline]
    pub fn is_descendant_of(&self, other: &TileAddress) -> bool {
        other.is_ancestor_of(self)
    }

    /// Returns `true` if this tile is `other` or one of its ancestors.
    #[inline]
    pub fn covers(&self, other: &TileAddress) -> bool {
        self == other || self.is_ancestor_of(other)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.row, self.col)
    }
}

/// `2^levels`, clamped to the supported zoom range.
#[inline]
fn span(levels: u8) -> i64 {
    1i64 << levels.min(MAX_ZOOM)
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    #[error("Invalid latitude: {0} (must be between {} and {})", MIN_LAT, MAX_LAT)]
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    #[error("Invalid longitude: {0} (must be between {} and {})", MIN_LON, MAX_LON)]
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    #[error("Invalid zoom level: {0} (must be between {} and {})", MIN_ZOOM, MAX_ZOOM)]
    InvalidZoom(u8),
    /// Quadkey contains invalid characters or is too long
    #[error("Invalid quadkey: '{0}' (must contain only digits 0-3 and length <= {})", MAX_ZOOM)]
    InvalidQuadkey(String),
    /// A visible region covers more tiles than one view may request
    #[error("Region covers {tiles} tiles (limit {limit})")]
    RegionTooLarge { tiles: u64, limit: u64 },
}
