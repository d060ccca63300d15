//! Tests for tile addressing and coordinate conversion

use super::*;
use proptest::prelude::*;

// =============================================================================
// Geographic conversion
// =============================================================================

#[test]
fn test_new_york_city_at_zoom_16() {
    // New York City: 40.7128°N, 74.0060°W
    let tile = to_tile_address(40.7128, -74.0060, 16).unwrap();
    assert_eq!(tile.row, 24640, "NYC latitude should map to row 24640");
    assert_eq!(tile.col, 19295, "NYC longitude should map to col 19295");
    assert_eq!(tile.zoom, 16);
}

#[test]
fn test_london_at_zoom_10() {
    let tile = to_tile_address(51.5074, -0.1278, 10).unwrap();
    assert_eq!(tile, TileAddress::new(10, 340, 511));
}

#[test]
fn test_equator_prime_meridian() {
    // At zoom 1: 2×2 tiles, 0°N 0°E sits on the corner shared by all four
    let tile = to_tile_address(0.0, 0.0, 1).unwrap();
    assert_eq!(tile, TileAddress::new(1, 1, 1));
}

#[test]
fn test_far_edge_stays_in_range() {
    let tile = to_tile_address(MIN_LAT, MAX_LON, 4).unwrap();
    assert!(tile.is_in_range(), "Far edge should clamp into the pyramid");
    assert_eq!(tile, TileAddress::new(4, 15, 15));
}

#[test]
fn test_invalid_latitude() {
    assert!(matches!(
        to_tile_address(90.0, 0.0, 10).unwrap_err(),
        CoordError::InvalidLatitude(_)
    ));
    assert!(matches!(
        to_world_position(-90.0, 0.0).unwrap_err(),
        CoordError::InvalidLatitude(_)
    ));
}

#[test]
fn test_invalid_longitude() {
    assert!(matches!(
        to_tile_address(0.0, 181.0, 10).unwrap_err(),
        CoordError::InvalidLongitude(_)
    ));
}

#[test]
fn test_invalid_zoom() {
    assert_eq!(
        to_tile_address(0.0, 0.0, MAX_ZOOM + 1).unwrap_err(),
        CoordError::InvalidZoom(MAX_ZOOM + 1)
    );
    assert!(TileAddress::checked(MAX_ZOOM + 1, 0, 0).is_err());
    assert!(TileAddress::checked(MAX_ZOOM, 0, 0).is_ok());
}

#[test]
fn test_world_position_center() {
    let (x, y) = to_world_position(0.0, 0.0).unwrap();
    assert!((x - 0.5).abs() < 1e-12);
    assert!((y - 0.5).abs() < 1e-12);
}

#[test]
fn test_roundtrip_at_different_zooms() {
    let (lat, lon) = (51.5074, -0.1278);

    for zoom in [0, 5, 10, 15, 18] {
        let tile = to_tile_address(lat, lon, zoom).unwrap();
        let (converted_lat, converted_lon) = tile_to_lat_lon(&tile);

        // tile_to_lat_lon returns the northwest corner, so allow a full tile
        let tile_size_degrees = 360.0 / (2.0_f64.powi(zoom as i32));
        assert!(
            (converted_lat - lat).abs() < tile_size_degrees,
            "Zoom {}: lat diff {} exceeds tile size {}",
            zoom,
            (converted_lat - lat).abs(),
            tile_size_degrees
        );
        assert!((converted_lon - lon).abs() < tile_size_degrees);
    }
}

// =============================================================================
// Normalization
// =============================================================================

#[test]
fn test_normalize_in_range_is_identity() {
    let tile = TileAddress::new(3, 5, 7);
    assert_eq!(tile.normalized(), tile);
}

#[test]
fn test_normalize_wraps_negative() {
    let tile = TileAddress::new(2, -1, -5);
    assert_eq!(tile.normalized(), TileAddress::new(2, 3, 3));
}

#[test]
fn test_normalize_wraps_past_edge() {
    let tile = TileAddress::new(2, 4, 9);
    assert_eq!(tile.normalized(), TileAddress::new(2, 0, 1));
    assert!(!tile.is_in_range());
    assert!(tile.normalized().is_in_range());
}

#[test]
fn test_zoom_zero_normalizes_everything_to_origin() {
    assert_eq!(
        TileAddress::new(0, -3, 12).normalized(),
        TileAddress::new(0, 0, 0)
    );
}

// =============================================================================
// Quad-tree relations
// =============================================================================

#[test]
fn test_ancestor_relation_from_definition() {
    // (5,3,3) lies inside (4,1,1) since floor(3/2) == 1
    let ancestor = TileAddress::new(4, 1, 1);
    let tile = TileAddress::new(5, 3, 3);
    assert!(ancestor.is_ancestor_of(&tile));
    assert!(tile.is_descendant_of(&ancestor));
    assert!(!tile.is_ancestor_of(&ancestor));
}

#[test]
fn test_same_zoom_is_never_ancestor() {
    let tile = TileAddress::new(4, 1, 1);
    assert!(!tile.is_ancestor_of(&tile));
    assert!(!tile.is_descendant_of(&tile));
    assert!(tile.covers(&tile));
}

#[test]
fn test_ancestor_at_multiple_levels() {
    let tile = TileAddress::new(6, 45, 13);
    assert_eq!(tile.ancestor_at(3), Some(TileAddress::new(3, 5, 1)));
    assert_eq!(tile.ancestor_at(0), Some(TileAddress::new(0, 0, 0)));
    assert_eq!(tile.ancestor_at(6), None);
    assert_eq!(tile.ancestor_at(7), None);
}

#[test]
fn test_parent_of_root_is_none() {
    assert_eq!(TileAddress::new(0, 0, 0).parent(), None);
    assert_eq!(
        TileAddress::new(1, 1, 0).parent(),
        Some(TileAddress::new(0, 0, 0))
    );
}

#[test]
fn test_ancestor_of_out_of_range_uses_floor_division() {
    // row -1 at zoom 3 belongs to row -1 at zoom 2 (floor(-1/2) == -1)
    let tile = TileAddress::new(3, -1, 2);
    assert_eq!(tile.parent(), Some(TileAddress::new(2, -1, 1)));
}

#[test]
fn test_children_cover_parent() {
    let parent = TileAddress::new(2, 1, 3);
    let children = parent.children();
    assert_eq!(children[0], TileAddress::new(3, 2, 6));
    assert_eq!(children[3], TileAddress::new(3, 3, 7));
    for child in children {
        assert_eq!(child.parent(), Some(parent));
    }
}

#[test]
fn test_unrelated_tiles() {
    let a = TileAddress::new(2, 0, 0);
    let b = TileAddress::new(4, 15, 15);
    assert!(!a.is_ancestor_of(&b));
    assert!(!b.is_descendant_of(&a));
}

// =============================================================================
// Quadkeys
// =============================================================================

#[test]
fn test_quadkey_known_value() {
    // Bing Maps documentation example: tile (x=3, y=5) at level 3
    let tile = TileAddress::new(3, 5, 3);
    assert_eq!(tile_to_quadkey(&tile), "213");
    assert_eq!(quadkey_to_tile("213").unwrap(), tile);
}

#[test]
fn test_quadkey_methods_normalize() {
    // (3, -3, 11) wraps to (3, 5, 3)
    assert_eq!(TileAddress::new(3, -3, 11).to_quadkey(), "213");
    assert_eq!(
        TileAddress::from_quadkey("213").unwrap(),
        TileAddress::new(3, 5, 3)
    );
}

#[test]
fn test_quadkey_zoom_zero_is_empty() {
    assert_eq!(tile_to_quadkey(&TileAddress::new(0, 0, 0)), "");
    assert_eq!(quadkey_to_tile("").unwrap(), TileAddress::new(0, 0, 0));
}

#[test]
fn test_quadkey_rejects_bad_digits() {
    assert!(matches!(
        quadkey_to_tile("0124"),
        Err(CoordError::InvalidQuadkey(_))
    ));
}

#[test]
fn test_quadkey_rejects_too_long() {
    let long = "0".repeat(MAX_ZOOM as usize + 1);
    assert!(quadkey_to_tile(&long).is_err());
}

#[test]
fn test_quadkey_of_parent_is_prefix() {
    let tile = TileAddress::new(7, 100, 33);
    let parent = tile.parent().unwrap();
    let key = tile_to_quadkey(&tile);
    assert!(key.starts_with(&tile_to_quadkey(&parent)));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Property: the ancestor relation agrees with integer division by 2^(zb - za).
    #[test]
    fn prop_ancestor_matches_division(
        zb in 1u8..20,
        za_offset in 1u8..20,
        row in 0i64..1_000_000,
        col in 0i64..1_000_000,
    ) {
        prop_assume!(za_offset <= zb);
        let za = zb - za_offset;
        let tile = TileAddress::new(zb, row, col);
        let s = 1i64 << (zb - za);
        let expected = TileAddress::new(za, row / s, col / s);

        prop_assert!(expected.is_ancestor_of(&tile));
        prop_assert_eq!(tile.ancestor_at(za), Some(expected));
    }

    /// Property: normalization is idempotent and always lands in range.
    #[test]
    fn prop_normalize_idempotent(
        zoom in 0u8..=MAX_ZOOM,
        row in -10_000_000i64..10_000_000,
        col in -10_000_000i64..10_000_000,
    ) {
        let n = TileAddress::new(zoom, row, col).normalized();
        prop_assert!(n.is_in_range());
        prop_assert_eq!(n.normalized(), n);
    }

    /// Property: quadkeys round-trip for in-range tiles.
    #[test]
    fn prop_quadkey_roundtrip(zoom in 0u8..=20, row_seed in 0i64..i64::MAX, col_seed in 0i64..i64::MAX) {
        let n = TileAddress::tiles_per_side(zoom);
        let tile = TileAddress::new(zoom, row_seed % n, col_seed % n);
        prop_assert_eq!(quadkey_to_tile(&tile_to_quadkey(&tile)).unwrap(), tile);
    }
}
