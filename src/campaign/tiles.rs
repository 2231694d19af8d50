use bevy::prelude::*;
use hexx::Hex;

use crate::coords::HexKey;
use crate::scenario::Faction;

/// Strategic installation type of a campaign tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum CampaignTileKind {
    /// Bunkers and heavy batteries.
    FortificationHeavy,
    /// Field fortifications.
    FortificationLight,
    /// Port with naval forces.
    NavalBase,
    /// Supply depot.
    Logistics,
    /// Air base.
    Airbase,
    /// Town or city.
    City,
}

impl CampaignTileKind {
    const NAMES: [(&'static str, CampaignTileKind); 6] = [
        ("FortificationHeavy", CampaignTileKind::FortificationHeavy),
        ("FortificationLight", CampaignTileKind::FortificationLight),
        ("NavalBase", CampaignTileKind::NavalBase),
        ("Logistics", CampaignTileKind::Logistics),
        ("Airbase", CampaignTileKind::Airbase),
        ("City", CampaignTileKind::City),
    ];

    /// Splits a tile id such as `botNavalBase` into owner and kind.
    pub fn parse_tile_id(id: &str) -> Option<(Faction, CampaignTileKind)> {
        let (owner, rest) = if let Some(rest) = id.strip_prefix("bot") {
            (Faction::Bot, rest)
        } else if let Some(rest) = id.strip_prefix("player") {
            (Faction::Player, rest)
        } else {
            return None;
        };
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == rest)
            .map(|(_, kind)| (owner, *kind))
    }

    /// Tile id for an owner and kind; inverse of
    /// [`CampaignTileKind::parse_tile_id`].
    pub fn tile_id(self, owner: Faction) -> String {
        let prefix = match owner {
            Faction::Bot => "bot",
            Faction::Player => "player",
        };
        let name = Self::NAMES
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
            .unwrap_or_default();
        format!("{prefix}{name}")
    }

    /// Two-letter map marker.
    pub fn marker(self) -> &'static str {
        match self {
            CampaignTileKind::FortificationHeavy => "FH",
            CampaignTileKind::FortificationLight => "FL",
            CampaignTileKind::NavalBase => "NB",
            CampaignTileKind::Logistics => "LG",
            CampaignTileKind::Airbase => "AB",
            CampaignTileKind::City => "CT",
        }
    }
}

/// A garrison entry on a campaign tile.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct Force {
    /// Unit type id (`Artillery_155mm`, `Infantry_42`, ...).
    pub unit_type: String,
    /// Number of units.
    pub count: u32,
    /// Display name.
    pub label: String,
}

impl Force {
    /// A garrison entry.
    pub fn new(unit_type: impl Into<String>, count: u32, label: impl Into<String>) -> Self {
        Self {
            unit_type: unit_type.into(),
            count,
            label: label.into(),
        }
    }
}

/// An installation on the strategic map.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignTile {
    /// Installation type.
    pub kind: CampaignTileKind,
    /// Controlling side.
    pub owner: Faction,
    /// Axial position.
    pub hex: Hex,
    /// Garrison.
    pub forces: Vec<Force>,
    /// Marker rotation in 60° steps.
    pub rotation: u8,
    /// Day and segment since which the owner holds the tile.
    pub control_since: (u32, u32),
}

impl CampaignTile {
    /// Tile at axial `(q, r)` with no garrison.
    pub fn new(kind: CampaignTileKind, owner: Faction, q: i32, r: i32) -> Self {
        Self {
            kind,
            owner,
            hex: Hex::new(q, r),
            forces: Vec::new(),
            rotation: 0,
            control_since: (1, 0),
        }
    }

    /// Adds a garrison entry.
    pub fn with_force(mut self, force: Force) -> Self {
        self.forces.push(force);
        self
    }

    /// Hex key of the tile.
    pub fn key(&self) -> HexKey {
        HexKey::from_axial(self.hex)
    }

    /// Total units in the garrison.
    pub fn unit_count(&self) -> u32 {
        self.forces.iter().map(|f| f.count).sum()
    }
}

/// Input to a campaign render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignScenario {
    /// Official columns (axial q range).
    pub cols: i32,
    /// Official rows (axial r range).
    pub rows: i32,
    /// Installations.
    pub tiles: Vec<CampaignTile>,
}

impl CampaignScenario {
    /// Empty map of the given size.
    pub fn new(cols: i32, rows: i32) -> Self {
        Self {
            cols,
            rows,
            tiles: Vec::new(),
        }
    }
}
