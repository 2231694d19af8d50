//! Read-only scenario snapshots handed in by the simulation layer.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::coords::HexKey;
use crate::units::Facing;

/// Terrain category of a tile; drives fill color and boat overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum TerrainType {
    /// Open ground.
    #[default]
    Clear,
    /// Woods.
    Forest,
    /// Hills and ridges.
    Hills,
    /// Built-up area.
    Urban,
    /// Marsh.
    Swamp,
    /// Shallow coastal water.
    Coast,
    /// Open water.
    Sea,
}

impl TerrainType {
    /// Water tiles carry units on transport vessels.
    pub fn is_maritime(self) -> bool {
        matches!(self, Self::Coast | Self::Sea)
    }

    /// Base fill color for the hex polygon.
    pub fn fill_color(self) -> Color {
        match self {
            Self::Clear => Color::srgb(0.42, 0.48, 0.30),
            Self::Forest => Color::srgb(0.20, 0.34, 0.18),
            Self::Hills => Color::srgb(0.50, 0.44, 0.32),
            Self::Urban => Color::srgb(0.45, 0.45, 0.48),
            Self::Swamp => Color::srgb(0.30, 0.38, 0.32),
            Self::Coast => Color::srgb(0.24, 0.42, 0.55),
            Self::Sea => Color::srgb(0.10, 0.22, 0.40),
        }
    }
}

/// What the viewing player knows about a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum ReconStatus {
    /// Fully visible.
    #[default]
    Visible,
    /// Occupant known from recon only; drawn semi-transparent.
    Spotted,
    /// Nothing known; occupant is not drawn.
    Hidden,
}

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum Faction {
    /// The local player.
    #[default]
    Player,
    /// The opposing side.
    Bot,
}

impl Faction {
    /// Tint applied to unit icons.
    pub fn color(self) -> Color {
        match self {
            Self::Player => Color::srgb(0.35, 0.60, 1.0),
            Self::Bot => Color::srgb(0.95, 0.35, 0.30),
        }
    }
}

/// Occupant of a tile as reported by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSnapshot {
    /// Unit type id, resolved through [`crate::catalog::UnitCatalog`].
    pub type_id: String,
    /// Owning side.
    pub faction: Faction,
    /// Remaining strength, nominally `0..=100`.
    pub strength: f32,
    /// Explicit facing, if the simulation tracks one.
    pub facing: Option<Facing>,
}

impl UnitSnapshot {
    /// Full-strength unit with no explicit facing.
    pub fn new(type_id: impl Into<String>, faction: Faction) -> Self {
        Self {
            type_id: type_id.into(),
            faction,
            strength: 100.0,
            facing: None,
        }
    }

    /// Sets the strength.
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Sets the facing.
    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = Some(facing);
        self
    }
}

/// One tile of the scenario.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileSnapshot {
    /// Terrain id from the scenario data (used for labels/debugging).
    pub terrain_id: String,
    /// Terrain category.
    pub terrain: TerrainType,
    /// Recon status for the viewing player.
    pub recon: ReconStatus,
    /// Current occupant.
    pub occupant: Option<UnitSnapshot>,
}

/// Everything a full battlefield render needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScenarioData {
    /// Grid width in offset columns.
    pub cols: i32,
    /// Grid height in offset rows.
    pub rows: i32,
    /// Per-hex data; hexes without an entry render as clear terrain.
    pub tiles: BTreeMap<HexKey, TileSnapshot>,
}

impl ScenarioData {
    /// Empty `cols × rows` scenario.
    pub fn new(cols: i32, rows: i32) -> Self {
        Self {
            cols,
            rows,
            tiles: BTreeMap::new(),
        }
    }

    /// Whether a key lies inside the grid.
    pub fn contains(&self, key: HexKey) -> bool {
        (0..self.cols).contains(&key.col) && (0..self.rows).contains(&key.row)
    }

    /// All keys of the grid in column-major order.
    pub fn keys(&self) -> impl Iterator<Item = HexKey> + '_ {
        (0..self.cols).flat_map(move |col| (0..self.rows).map(move |row| HexKey::new(col, row)))
    }

    /// Tile data for a key (default clear tile when unset).
    pub fn tile(&self, key: HexKey) -> TileSnapshot {
        self.tiles.get(&key).cloned().unwrap_or_default()
    }

    /// Sets the terrain of a tile.
    pub fn set_terrain(&mut self, key: HexKey, terrain: TerrainType) -> &mut Self {
        self.tiles.entry(key).or_default().terrain = terrain;
        self
    }

    /// Places a unit on a tile.
    pub fn place(&mut self, key: HexKey, unit: UnitSnapshot) -> &mut Self {
        self.tiles.entry(key).or_default().occupant = Some(unit);
        self
    }
}
