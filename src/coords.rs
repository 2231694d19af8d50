//! Coordinate system: offset (col,row) ⇄ axial (q,r) ⇄ pixel (x,y).
//!
//! Hexes are flat-topped and stored in "odd-q" offset order: odd columns are
//! shoved half a hex down. Pixel space has y growing downward, matching the
//! scenario data and the retained scene. Everything here is stateless.

use std::fmt;
use std::str::FromStr;

use bevy::math::Vec2;
use bevy::prelude::default;
use hexx::{Hex, HexLayout, HexOrientation};

use crate::error::RenderError;

/// Identity of a grid cell in offset coordinates.
///
/// The string form is `"col,row"`; [`HexKey::parse`] is its exact inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HexKey {
    /// Offset column.
    pub col: i32,
    /// Offset row.
    pub row: i32,
}

impl HexKey {
    /// Key for offset position `(col, row)`.
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Key of the cell at an axial coordinate.
    pub fn from_axial(hex: Hex) -> Self {
        let (col, row) = axial_to_offset(hex);
        Self { col, row }
    }

    /// Axial coordinate of this cell.
    pub fn to_axial(self) -> Hex {
        offset_to_axial(self.col, self.row)
    }

    /// Parses `"col,row"` (whitespace around either number is tolerated).
    pub fn parse(s: &str) -> Result<Self, RenderError> {
        let malformed = || RenderError::MalformedKey(s.to_owned());
        let (col, row) = s.split_once(',').ok_or_else(malformed)?;
        let col = col.trim().parse().map_err(|_| malformed())?;
        let row = row.trim().parse().map_err(|_| malformed())?;
        Ok(Self { col, row })
    }

    /// Stable 32-bit seed for procedural visuals (FNV-1a over the string form).
    pub fn seed(self) -> u32 {
        let mut hash: u32 = 0x811c_9dc5;
        for byte in self.to_string().bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
        hash
    }
}

impl fmt::Display for HexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

impl FromStr for HexKey {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Offset ⇄ axial ─────────────────────────────────────────────────

/// Converts an odd-q offset position to axial coordinates.
pub fn offset_to_axial(col: i32, row: i32) -> Hex {
    Hex::new(col, row - (col - (col & 1)) / 2)
}

/// Converts axial coordinates to an odd-q offset `(col, row)`.
pub fn axial_to_offset(hex: Hex) -> (i32, i32) {
    let q = hex.x;
    (q, hex.y + (q - (q & 1)) / 2)
}

// ── Axial ⇄ pixel ──────────────────────────────────────────────────

/// Flat-top layout for a given circumradius, centered on the origin. No axis
/// is inverted, so pixel y grows downward.
pub fn layout(radius: f32) -> HexLayout {
    HexLayout {
        orientation: HexOrientation::Flat,
        scale: Vec2::splat(radius),
        ..default()
    }
}

/// Pixel center of an axial hex for a given circumradius.
pub fn axial_to_pixel(hex: Hex, radius: f32) -> Vec2 {
    layout(radius).hex_to_world_pos(hex)
}

/// Pixel center of an offset cell.
pub fn offset_to_pixel(key: HexKey, radius: f32) -> Vec2 {
    axial_to_pixel(key.to_axial(), radius)
}

/// The hex containing a pixel position.
pub fn pixel_to_axial(point: Vec2, radius: f32) -> Hex {
    layout(radius).world_pos_to_hex(point)
}

// ── Geometry ───────────────────────────────────────────────────────

/// The six corners of a flat-top hex, starting at the east vertex and going
/// clockwise on screen.
pub fn hex_polygon(center: Vec2, radius: f32) -> [Vec2; 6] {
    layout(radius)
        .center_aligned_hex_corners()
        .map(|corner| center + corner)
}

/// Axial cells on the straight path from `a` to `b`, both ends included.
pub fn hex_line(a: Hex, b: Hex) -> Vec<Hex> {
    if a == b {
        return vec![a];
    }
    a.line_to(b).collect()
}

/// Hex distance between two offset cells.
pub fn distance(a: HexKey, b: HexKey) -> u32 {
    a.to_axial().unsigned_distance_to(b.to_axial())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ── offset ⇄ axial ──────────────────────────────────────────────

    #[test]
    fn sample_mapping_matches_scenario_convention() {
        assert_eq!(offset_to_axial(8, 6), Hex::new(8, 2));
    }

    #[test]
    fn offset_roundtrip_over_scenario_range() {
        for col in 0..=100 {
            for row in 0..=100 {
                assert_eq!(axial_to_offset(offset_to_axial(col, row)), (col, row));
            }
        }
    }

    #[test]
    fn odd_columns_are_shoved_down() {
        // (1,0) sits half a hex below (0,0) and (2,0).
        let a = offset_to_pixel(HexKey::new(0, 0), 10.0);
        let b = offset_to_pixel(HexKey::new(1, 0), 10.0);
        let c = offset_to_pixel(HexKey::new(2, 0), 10.0);
        assert!(b.y > a.y);
        assert!((a.y - c.y).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn offset_roundtrip_any_integer(col in -10_000i32..10_000, row in -10_000i32..10_000) {
            prop_assert_eq!(axial_to_offset(offset_to_axial(col, row)), (col, row));
        }

        #[test]
        fn key_string_roundtrip(col in -500i32..500, row in -500i32..500) {
            let key = HexKey::new(col, row);
            prop_assert_eq!(HexKey::parse(&key.to_string()), Ok(key));
        }
    }

    // ── pixel ───────────────────────────────────────────────────────

    #[test]
    fn pixel_roundtrip_for_centers() {
        for col in -5..15 {
            for row in -5..15 {
                let hex = offset_to_axial(col, row);
                let px = axial_to_pixel(hex, 18.0);
                assert_eq!(pixel_to_axial(px, 18.0), hex, "roundtrip failed at {col},{row}");
            }
        }
    }

    #[test]
    fn neighbor_centers_are_sqrt3_radius_apart() {
        let radius = 20.0;
        let a = axial_to_pixel(Hex::ZERO, radius);
        for n in Hex::ZERO.all_neighbors() {
            let d = a.distance(axial_to_pixel(n, radius));
            assert!((d - 3f32.sqrt() * radius).abs() < 1e-3, "got {d}");
        }
    }

    #[test]
    fn polygon_vertices_lie_on_circumcircle() {
        let center = Vec2::new(40.0, -12.0);
        for v in hex_polygon(center, 15.0) {
            assert!((v.distance(center) - 15.0).abs() < 1e-4);
        }
    }

    #[test]
    fn polygon_starts_east_and_turns_clockwise_on_screen() {
        let corners = hex_polygon(Vec2::ZERO, 10.0);
        assert!((corners[0] - Vec2::new(10.0, 0.0)).length() < 1e-4);
        // y grows downward, so the second corner sits below the first.
        assert!(corners[1].y > 0.0 && corners[1].x > 0.0);
        assert!((corners[3] - Vec2::new(-10.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn off_center_points_resolve_to_the_containing_hex() {
        let radius = 24.0;
        let hex = offset_to_axial(3, 2);
        let center = axial_to_pixel(hex, radius);
        for corner in hex_polygon(Vec2::ZERO, radius) {
            assert_eq!(pixel_to_axial(center + corner * 0.8, radius), hex);
        }
    }

    // ── lines ───────────────────────────────────────────────────────

    #[test]
    fn line_to_self_is_single_cell() {
        let a = Hex::new(3, -1);
        assert_eq!(hex_line(a, a), vec![a]);
    }

    #[test]
    fn line_includes_endpoints_and_is_contiguous() {
        let a = offset_to_axial(1, 1);
        let b = offset_to_axial(7, 4);
        let line = hex_line(a, b);
        assert_eq!(line.first(), Some(&a));
        assert_eq!(line.last(), Some(&b));
        assert_eq!(line.len() as u32, a.unsigned_distance_to(b) + 1);
        for w in line.windows(2) {
            assert_eq!(w[0].unsigned_distance_to(w[1]), 1);
        }
    }

    // ── keys ────────────────────────────────────────────────────────

    #[test]
    fn key_parse_accepts_whitespace() {
        assert_eq!(HexKey::parse(" 5 , 7"), Ok(HexKey::new(5, 7)));
    }

    #[test]
    fn key_parse_rejects_garbage() {
        for bad in ["", "5", "5,", "a,b", "1,2,3", "5;5"] {
            assert!(
                matches!(HexKey::parse(bad), Err(RenderError::MalformedKey(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn key_seed_is_stable_and_distinct() {
        let a = HexKey::new(5, 5);
        assert_eq!(a.seed(), HexKey::new(5, 5).seed());
        assert_ne!(a.seed(), HexKey::new(5, 6).seed());
    }

    #[test]
    fn key_axial_roundtrip() {
        let key = HexKey::new(11, 3);
        assert_eq!(HexKey::from_axial(key.to_axial()), key);
    }
}
