//! Unit type catalog: type id → visual class and sprite key.
//!
//! The simulation owns the real catalog; the engine only needs this narrow
//! read-only view. [`StaticCatalog`] covers explicit registrations plus the
//! naming scheme used by scenario files (`Infantry_42`, `Artillery_155mm`,
//! `Patrol_Boat`, ...).

use std::collections::HashMap;

use bevy::prelude::*;

use crate::error::{RenderError, Result};

/// Visual class of a unit; selects icons, aftermath and combat archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum UnitClass {
    /// Foot soldiers.
    #[default]
    Infantry,
    /// Wheeled or light tracked vehicles.
    Vehicle,
    /// Main battle tanks.
    Tank,
    /// Tube and rocket artillery.
    Artillery,
    /// Aircraft.
    Air,
    /// Scouts.
    Recon,
    /// Engineers, HQs and other specialists.
    Specialist,
    /// Warships; never need a transport vessel.
    Naval,
}

impl UnitClass {
    /// Classes that burn and smoke when damaged.
    pub fn is_vehicle(self) -> bool {
        matches!(self, Self::Vehicle | Self::Tank)
    }

    /// Armored classes count as hard targets by default.
    pub fn is_hard(self) -> bool {
        matches!(self, Self::Vehicle | Self::Tank | Self::Naval)
    }

    /// Airborne classes.
    pub fn is_airborne(self) -> bool {
        matches!(self, Self::Air)
    }
}

/// Catalog entry for one unit type.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTypeInfo {
    /// Visual class.
    pub class: UnitClass,
    /// Sprite key handed to the scene backend.
    pub sprite: String,
    /// Air units that drop ordnance instead of strafing.
    pub bomber: bool,
}

impl UnitTypeInfo {
    /// Entry with the default sprite for a class.
    pub fn of_class(class: UnitClass) -> Self {
        Self {
            class,
            sprite: default_sprite(class).to_owned(),
            bomber: false,
        }
    }
}

/// Read-only lookup of unit types.
pub trait UnitCatalog: Send + Sync {
    /// Catalog entry for a type id, if known.
    fn lookup(&self, type_id: &str) -> Option<UnitTypeInfo>;

    /// Like [`UnitCatalog::lookup`] but reports unknown types as errors.
    fn resolve(&self, type_id: &str) -> Result<UnitTypeInfo> {
        self.lookup(type_id)
            .ok_or_else(|| RenderError::UnknownSprite(type_id.to_owned()))
    }
}

/// Catalog backed by explicit registrations with a name-based fallback.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<String, UnitTypeInfo>,
}

impl StaticCatalog {
    /// Empty catalog (name-based fallback only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a type.
    pub fn insert(&mut self, type_id: impl Into<String>, info: UnitTypeInfo) -> &mut Self {
        self.entries.insert(type_id.into(), info);
        self
    }
}

impl UnitCatalog for StaticCatalog {
    fn lookup(&self, type_id: &str) -> Option<UnitTypeInfo> {
        if let Some(info) = self.entries.get(type_id) {
            return Some(info.clone());
        }
        let class = classify_type_name(type_id)?;
        let bomber = class == UnitClass::Air && type_id.to_ascii_lowercase().contains("bomb");
        Some(UnitTypeInfo {
            class,
            sprite: default_sprite(class).to_owned(),
            bomber,
        })
    }
}

/// Guesses the class from a type id such as `Artillery_155mm` or `Tank_IV`.
pub fn classify_type_name(type_id: &str) -> Option<UnitClass> {
    let lower = type_id.to_ascii_lowercase();
    const RULES: &[(&[&str], UnitClass)] = &[
        (&["artillery", "howitzer", "mortar", "rocket"], UnitClass::Artillery),
        (&["tank", "panzer", "armor"], UnitClass::Tank),
        (
            &["bomber", "fighter", "aircraft", "plane", "air_"],
            UnitClass::Air,
        ),
        (
            &["destroyer", "cruiser", "boat", "ship", "battleship"],
            UnitClass::Naval,
        ),
        (&["recon", "scout"], UnitClass::Recon),
        (
            &["halftrack", "truck", "vehicle", "apc", "car"],
            UnitClass::Vehicle,
        ),
        (&["engineer", "hq", "commando", "medic"], UnitClass::Specialist),
        (&["infantry", "rifle", "paratroop", "militia"], UnitClass::Infantry),
    ];
    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, class)| *class)
}

/// Default sprite key per class.
pub fn default_sprite(class: UnitClass) -> &'static str {
    match class {
        UnitClass::Infantry => "unit/infantry",
        UnitClass::Vehicle => "unit/vehicle",
        UnitClass::Tank => "unit/tank",
        UnitClass::Artillery => "unit/artillery",
        UnitClass::Air => "unit/air",
        UnitClass::Recon => "unit/recon",
        UnitClass::Specialist => "unit/specialist",
        UnitClass::Naval => "unit/naval",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_type_names_classify() {
        assert_eq!(classify_type_name("Artillery_155mm"), Some(UnitClass::Artillery));
        assert_eq!(classify_type_name("Infantry_42"), Some(UnitClass::Infantry));
        assert_eq!(classify_type_name("Destroyer"), Some(UnitClass::Naval));
        assert_eq!(classify_type_name("Patrol_Boat"), Some(UnitClass::Naval));
        assert_eq!(classify_type_name("Tank_IV"), Some(UnitClass::Tank));
        assert_eq!(classify_type_name("Zeppelin"), None);
    }

    #[test]
    fn explicit_entries_win_over_names() {
        let mut catalog = StaticCatalog::new();
        catalog.insert("Tank_IV", UnitTypeInfo::of_class(UnitClass::Vehicle));
        assert_eq!(catalog.lookup("Tank_IV").unwrap().class, UnitClass::Vehicle);
    }

    #[test]
    fn bombers_are_flagged() {
        let catalog = StaticCatalog::new();
        assert!(catalog.lookup("Bomber_B17").unwrap().bomber);
        assert!(!catalog.lookup("Fighter_P51").unwrap().bomber);
    }

    #[test]
    fn unknown_type_is_sprite_error() {
        let catalog = StaticCatalog::new();
        assert_eq!(
            catalog.resolve("Zeppelin"),
            Err(RenderError::UnknownSprite("Zeppelin".into()))
        );
    }
}
