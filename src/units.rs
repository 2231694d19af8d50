//! Unit Stack Renderer: 1–4 stacked icons per hex with facing and opacity.
//!
//! Strength maps to a stack count, the count maps to a fixed layout whose
//! icon scale shrinks as the stack grows, and facing only ever mirrors the
//! sprite horizontally.

use bevy::log::warn;
use bevy::prelude::*;

use crate::battlefield::UnitSettings;
use crate::catalog::{UnitClass, UnitTypeInfo};
use crate::registry::HexCell;
use crate::scenario::{Faction, UnitSnapshot};
use crate::scene::{NodeId, NodeRole, NodeSpec, Placement, SceneGraph, Shape};

/// Icon scale per stack count (index 0 = single unit).
///
/// Strictly decreasing so icons never grow when a stack gains a member.
pub const STACK_SCALES: [f32; 4] = [0.82, 0.76, 0.71, 0.66];

/// Visual-state tag for units known only from recon.
pub const SPOTTED_TAG: &str = "spotted-only";

/// One of the six sides of a flat-top hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum Facing {
    /// Top side.
    North,
    /// Upper right side.
    NorthEast,
    /// Lower right side.
    SouthEast,
    /// Bottom side.
    South,
    /// Lower left side.
    SouthWest,
    /// Upper left side.
    NorthWest,
}

impl Facing {
    /// All six sides, clockwise from north.
    pub const ALL: [Facing; 6] = [
        Facing::North,
        Facing::NorthEast,
        Facing::SouthEast,
        Facing::South,
        Facing::SouthWest,
        Facing::NorthWest,
    ];

    /// Nearest side to a screen-space movement vector (y down).
    pub fn from_vector(v: Vec2) -> Option<Facing> {
        if v.length_squared() <= f32::EPSILON {
            return None;
        }
        // Angle clockwise from north in [0, 360).
        let angle = v.x.atan2(-v.y).to_degrees().rem_euclid(360.0);
        let index = ((angle + 30.0) / 60.0).floor() as usize % 6;
        Some(Self::ALL[index])
    }

    /// Horizontal direction this side points to: `-1`, `0` (straight up or
    /// down) or `1`.
    pub fn horizontal(self) -> i8 {
        match self {
            Facing::NorthEast | Facing::SouthEast => 1,
            Facing::SouthWest | Facing::NorthWest => -1,
            Facing::North | Facing::South => 0,
        }
    }
}

/// Where a unit's facing comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FacingSource {
    /// An explicit hex side from the simulation.
    Side(Facing),
    /// The direction of the last move.
    Movement(Vec2),
}

/// Resolves facing to a horizontal mirror flag.
///
/// Sprites are drawn facing right; straight-vertical facings fall back to the
/// faction default (player faces right, opponent faces left). Sprites are
/// never rotated.
pub fn resolve_mirror(source: Option<FacingSource>, faction: Faction) -> bool {
    let default = faction == Faction::Bot;
    let horizontal = match source {
        Some(FacingSource::Side(side)) => side.horizontal(),
        Some(FacingSource::Movement(v)) => Facing::from_vector(v).map_or(0, Facing::horizontal),
        None => 0,
    };
    match horizontal {
        0 => default,
        h => h < 0,
    }
}

/// Number of icons for a strength value: `ceil(clamp(strength,0,100)/25)`,
/// never fewer than one so a surviving unit stays visible.
pub fn stack_count(strength: f32) -> u8 {
    let s = if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 100.0)
    };
    ((s / 25.0).ceil() as u8).clamp(1, 4)
}

/// Position and scale of one icon in a stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackSlot {
    /// Offset from the hex center, in multiples of the hex radius.
    pub offset: Vec2,
    /// Icon scale.
    pub scale: f32,
}

/// Layout for a stack of `count` icons (clamped to 1..=4).
///
/// Single: centered. Pair: side by side. Triple: triangle. Quad: diamond.
pub fn stack_layout(count: u8) -> Vec<StackSlot> {
    let count = count.clamp(1, 4);
    let scale = STACK_SCALES[usize::from(count - 1)];
    let offsets: &[Vec2] = match count {
        1 => &[Vec2::ZERO],
        2 => &[Vec2::new(-0.22, 0.0), Vec2::new(0.22, 0.0)],
        3 => &[
            Vec2::new(0.0, -0.20),
            Vec2::new(-0.22, 0.16),
            Vec2::new(0.22, 0.16),
        ],
        _ => &[
            Vec2::new(0.0, -0.26),
            Vec2::new(-0.26, 0.0),
            Vec2::new(0.26, 0.0),
            Vec2::new(0.0, 0.26),
        ],
    };
    offsets
        .iter()
        .map(|&offset| StackSlot { offset, scale })
        .collect()
}

/// What was last drawn in a cell; read back by moves and attack sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedUnit {
    /// The snapshot that was drawn.
    pub snapshot: UnitSnapshot,
    /// Catalog entry used for the sprite.
    pub info: UnitTypeInfo,
    /// Owning side as drawn.
    pub faction: Faction,
    /// Drawn semi-transparent from recon only.
    pub spotted_only: bool,
    /// Horizontal mirror flag.
    pub mirror: bool,
    /// Icons in the stack.
    pub count: u8,
}

impl RenderedUnit {
    /// Visual class of the drawn unit.
    pub fn class(&self) -> UnitClass {
        self.info.class
    }
}

/// Draws (or redraws) the unit stack of a cell.
///
/// Any previous stack and boat are replaced so the boat always sits beneath
/// the icons in draw order.
#[allow(clippy::too_many_arguments)]
pub fn draw_stack(
    scene: &mut dyn SceneGraph,
    cell: &mut HexCell,
    unit: &UnitSnapshot,
    info: UnitTypeInfo,
    faction: Faction,
    spotted_only: bool,
    facing: Option<FacingSource>,
    settings: &UnitSettings,
    hex_radius: f32,
) {
    remove_stack(scene, cell);

    let needs_boat = cell.terrain.is_maritime()
        && !matches!(info.class, UnitClass::Naval | UnitClass::Air);
    if needs_boat {
        let hull = boat_hull(hex_radius * settings.boat_width);
        let boat = scene.create(
            Some(cell.node),
            NodeSpec::new(NodeRole::Boat, Shape::Polygon(hull))
                .hex(cell.key)
                .at(Vec2::new(0.0, hex_radius * 0.28))
                .color(settings.boat_color),
        );
        cell.boat = Some(boat);
    }

    let mirror = resolve_mirror(facing.or(unit.facing.map(FacingSource::Side)), faction);
    let count = stack_count(unit.strength);
    let opacity = if spotted_only {
        settings.spotted_opacity
    } else {
        1.0
    };

    let stack = scene.create(
        Some(cell.node),
        NodeSpec::new(NodeRole::UnitStack, Shape::Group)
            .hex(cell.key)
            .opacity(opacity),
    );
    scene.set_tag(stack, SPOTTED_TAG, spotted_only);

    for slot in stack_layout(count) {
        scene.create(
            Some(stack),
            NodeSpec::new(
                NodeRole::UnitIcon,
                Shape::Icon {
                    sprite: info.sprite.clone(),
                    size: hex_radius * settings.icon_size,
                },
            )
            .hex(cell.key)
            .placement(Placement {
                translation: slot.offset * hex_radius,
                scale: slot.scale,
                mirror_x: mirror,
            })
            .color(faction.color()),
        );
    }

    cell.unit_stack = Some(stack);
    cell.unit = Some(RenderedUnit {
        snapshot: unit.clone(),
        info,
        faction,
        spotted_only,
        mirror,
        count,
    });
}

/// Removes the stack and boat of a cell. Returns whether anything was drawn.
pub fn remove_stack(scene: &mut dyn SceneGraph, cell: &mut HexCell) -> bool {
    let mut removed = false;
    if let Some(stack) = cell.unit_stack.take() {
        removed |= scene.remove(stack);
    }
    if let Some(boat) = cell.boat.take() {
        removed |= scene.remove(boat);
    }
    if cell.unit.take().is_some() {
        removed = true;
    }
    removed
}

/// Mirrors every icon of an existing stack without redrawing it.
pub fn set_stack_mirror(scene: &mut dyn SceneGraph, cell: &mut HexCell, mirror: bool) {
    let Some(stack) = cell.unit_stack else {
        warn!(hex = %cell.key, "no unit stack to turn");
        return;
    };
    mirror_icons(scene, stack, mirror);
    if let Some(unit) = cell.unit.as_mut() {
        unit.mirror = mirror;
    }
}

/// Sets the mirror flag on every icon below `stack` (also used on ghosts).
pub fn mirror_icons(scene: &mut dyn SceneGraph, stack: NodeId, mirror: bool) {
    let icons = scene
        .node(stack)
        .map(|n| n.children.clone())
        .unwrap_or_default();
    for icon in icons {
        let Some(mut placement) = scene.node(icon).map(|n| n.placement) else {
            continue;
        };
        placement.mirror_x = mirror;
        scene.set_placement(icon, placement);
    }
}

fn boat_hull(width: f32) -> Vec<Vec2> {
    let h = width * 0.22;
    vec![
        Vec2::new(-width / 2.0, -h / 2.0),
        Vec2::new(width / 2.0, -h / 2.0),
        Vec2::new(width * 0.38, h / 2.0),
        Vec2::new(-width * 0.38, h / 2.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── stack count ─────────────────────────────────────────────────

    #[test]
    fn strength_thresholds_map_to_counts() {
        let counts: Vec<u8> = [1.0, 26.0, 51.0, 76.0, 100.0]
            .iter()
            .map(|&s| stack_count(s))
            .collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 4]);
    }

    #[test]
    fn out_of_range_strength_is_clamped() {
        assert_eq!(stack_count(-20.0), 1);
        assert_eq!(stack_count(0.0), 1);
        assert_eq!(stack_count(250.0), 4);
        assert_eq!(stack_count(f32::NAN), 1);
        assert_eq!(stack_count(25.0), 1);
        assert_eq!(stack_count(25.01), 2);
    }

    // ── layout ──────────────────────────────────────────────────────

    #[test]
    fn layout_has_one_slot_per_icon() {
        for n in 1..=4 {
            assert_eq!(stack_layout(n).len(), usize::from(n));
        }
    }

    #[test]
    fn scale_never_grows_with_count() {
        let scales: Vec<f32> = [1.0, 26.0, 51.0, 76.0, 100.0]
            .iter()
            .map(|&s| stack_layout(stack_count(s))[0].scale)
            .collect();
        for w in scales.windows(2) {
            assert!(w[1] <= w[0], "scale must be non-increasing: {scales:?}");
        }
        assert_eq!(scales[0], 0.82);
        assert_eq!(scales[4], 0.66);
    }

    #[test]
    fn single_is_centered_and_pair_is_side_by_side() {
        assert_eq!(stack_layout(1)[0].offset, Vec2::ZERO);
        let pair = stack_layout(2);
        assert_eq!(pair[0].offset.y, pair[1].offset.y);
        assert!(pair[0].offset.x < 0.0 && pair[1].offset.x > 0.0);
    }

    #[test]
    fn quad_is_a_diamond() {
        let quad = stack_layout(4);
        let centroid: Vec2 = quad.iter().map(|s| s.offset).sum::<Vec2>() / 4.0;
        assert!(centroid.length() < 1e-6);
        let d = quad[0].offset.length();
        assert!(quad.iter().all(|s| (s.offset.length() - d).abs() < 1e-6));
    }

    // ── facing ──────────────────────────────────────────────────────

    #[test]
    fn vector_maps_to_nearest_side() {
        assert_eq!(Facing::from_vector(Vec2::new(0.0, -1.0)), Some(Facing::North));
        assert_eq!(Facing::from_vector(Vec2::new(0.0, 1.0)), Some(Facing::South));
        assert_eq!(Facing::from_vector(Vec2::new(1.0, -0.5)), Some(Facing::NorthEast));
        assert_eq!(Facing::from_vector(Vec2::new(-1.0, 0.5)), Some(Facing::SouthWest));
        assert_eq!(Facing::from_vector(Vec2::ZERO), None);
    }

    #[test]
    fn facing_only_mirrors() {
        assert!(!resolve_mirror(Some(FacingSource::Side(Facing::NorthEast)), Faction::Bot));
        assert!(resolve_mirror(Some(FacingSource::Side(Facing::SouthWest)), Faction::Player));
        assert!(resolve_mirror(
            Some(FacingSource::Movement(Vec2::new(-3.0, 1.0))),
            Faction::Player
        ));
    }

    #[test]
    fn vertical_facing_uses_faction_default() {
        assert!(!resolve_mirror(Some(FacingSource::Side(Facing::North)), Faction::Player));
        assert!(resolve_mirror(Some(FacingSource::Side(Facing::South)), Faction::Bot));
        assert!(resolve_mirror(None, Faction::Bot));
        assert!(!resolve_mirror(
            Some(FacingSource::Movement(Vec2::new(0.0, 5.0))),
            Faction::Player
        ));
    }

    #[test]
    fn steep_moves_snap_to_a_vertical_side() {
        let steep = Some(FacingSource::Movement(Vec2::new(0.2, -9.0)));
        assert!(!resolve_mirror(steep, Faction::Player));
        assert!(resolve_mirror(steep, Faction::Bot));
    }
}
