//! Coordinate module
//!
//! Tile addressing in a power-of-two quad-tree pyramid, the containment
//! relations used by the fallback resolver, and conversions between
//! geographic coordinates (latitude/longitude) and Web Mercator world space.

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    CoordError, TileAddress, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to a fractional Web Mercator position.
///
/// Returns `(x, y)` with both components in `[0, 1]`: `x` grows eastward from
/// the antimeridian and `y` grows southward from the northern limit. A tile
/// address at zoom `z` covers `[col, col + 1) / 2^z` horizontally.
pub fn to_world_position(lat: f64, lon: f64) -> Result<(f64, f64), CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }

    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0;

    Ok((x, y))
}

/// Converts geographic coordinates to the tile containing them.
#[inline]
pub fn to_tile_address(lat: f64, lon: f64, zoom: u8) -> Result<TileAddress, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    let (x, y) = to_world_position(lat, lon)?;
    let n = TileAddress::tiles_per_side(zoom);

    // lon = 180 and lat = MIN_LAT sit exactly on the far edge
    let col = ((x * n as f64) as i64).min(n - 1);
    let row = ((y * n as f64) as i64).min(n - 1);

    Ok(TileAddress::new(zoom, row, col))
}

/// Returns the latitude/longitude of the tile's northwest corner.
pub fn tile_to_lat_lon(tile: &TileAddress) -> (f64, f64) {
    let n = TileAddress::tiles_per_side(tile.zoom) as f64;

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Encodes a tile address as a Bing-style quadkey.
///
/// The address is normalized first. Zoom 0 encodes as the empty string.
pub fn tile_to_quadkey(tile: &TileAddress) -> String {
    let tile = tile.normalized();
    let mut quadkey = String::with_capacity(tile.zoom as usize);

    for level in (1..=tile.zoom).rev() {
        let mask = 1i64 << (level - 1);
        let mut digit = b'0';
        if tile.col & mask != 0 {
            digit += 1;
        }
        if tile.row & mask != 0 {
            digit += 2;
        }
        quadkey.push(digit as char);
    }

    quadkey
}

/// Decodes a Bing-style quadkey into a tile address.
pub fn quadkey_to_tile(quadkey: &str) -> Result<TileAddress, CoordError> {
    if quadkey.len() > MAX_ZOOM as usize {
        return Err(CoordError::InvalidQuadkey(quadkey.to_string()));
    }

    let (mut row, mut col) = (0i64, 0i64);
    for c in quadkey.chars() {
        row <<= 1;
        col <<= 1;
        match c {
            '0' => {}
            '1' => col |= 1,
            '2' => row |= 1,
            '3' => {
                row |= 1;
                col |= 1;
            }
            _ => return Err(CoordError::InvalidQuadkey(quadkey.to_string())),
        }
    }

    Ok(TileAddress::new(quadkey.len() as u8, row, col))
}

impl TileAddress {
    /// Quadkey of the normalized address.
    pub fn to_quadkey(&self) -> String {
        tile_to_quadkey(self)
    }

    /// Parses a quadkey. The empty string is the zoom-0 root tile.
    pub fn from_quadkey(quadkey: &str) -> Result<Self, CoordError> {
        quadkey_to_tile(quadkey)
    }
}
