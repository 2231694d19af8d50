//! Noise-generated demo data for the bundled viewer.

use bevy::log::info;
use bevy::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::campaign::{CampaignScenario, CampaignTile, CampaignTileKind, Force};
use crate::coords::{self, HexKey};
use crate::math::XorShift32;
use crate::presenter::{ActiveBattlefield, ActiveCampaign};
use crate::scenario::{Faction, ReconStatus, ScenarioData, TerrainType, UnitSnapshot};

/// Size and noise parameters of the demo maps.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct DemoSettings {
    /// Tactical grid columns.
    pub cols: i32,
    /// Tactical grid rows.
    pub rows: i32,
    /// Seed for terrain noise and unit placement.
    pub seed: u32,
    /// Spatial scale divisor for terrain noise sampling.
    pub noise_scale: f64,
    /// Octaves of terrain noise.
    pub octaves: usize,
    /// Units placed per side.
    pub units_per_side: usize,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            cols: 16,
            rows: 10,
            seed: 42,
            noise_scale: 6.0,
            octaves: 4,
            units_per_side: 6,
        }
    }
}

const UNIT_TYPES: [&str; 8] = [
    "Infantry_42",
    "Infantry_42",
    "Tank_IV",
    "Halftrack_251",
    "Artillery_155mm",
    "Recon_Scout",
    "Fighter_P51",
    "Bomber_B17",
];

fn terrain_for(value: f64) -> (TerrainType, &'static str) {
    match value {
        v if v < -0.35 => (TerrainType::Sea, "sea"),
        v if v < -0.22 => (TerrainType::Coast, "coast"),
        v if v < -0.12 => (TerrainType::Swamp, "swamp"),
        v if v < 0.15 => (TerrainType::Clear, "clear"),
        v if v < 0.3 => (TerrainType::Forest, "forest"),
        v if v < 0.45 => (TerrainType::Hills, "hills"),
        _ => (TerrainType::Urban, "urban"),
    }
}

/// Tactical scenario with Fbm terrain and both sides deployed on opposite
/// flanks. Opponent units deep in their own half are only spotted.
pub fn demo_scenario(settings: &DemoSettings) -> ScenarioData {
    let fbm: Fbm<Perlin> = Fbm::new(settings.seed).set_octaves(settings.octaves);
    let mut scenario = ScenarioData::new(settings.cols, settings.rows);
    let keys: Vec<HexKey> = scenario.keys().collect();
    for key in &keys {
        let pos = coords::offset_to_pixel(*key, 1.0);
        let value = fbm.get([
            pos.x as f64 / settings.noise_scale,
            pos.y as f64 / settings.noise_scale,
        ]);
        let (terrain, id) = terrain_for(value);
        let tile = scenario.tiles.entry(*key).or_default();
        tile.terrain = terrain;
        tile.terrain_id = id.to_owned();
    }

    let mut rng = XorShift32::new(settings.seed);
    let flank = (settings.cols / 3).max(1);
    for faction in [Faction::Player, Faction::Bot] {
        let mut placed = 0;
        let mut attempts = 0;
        while placed < settings.units_per_side && attempts < settings.units_per_side * 20 {
            attempts += 1;
            let col = (rng.next_u32() % flank as u32) as i32;
            let col = match faction {
                Faction::Player => col,
                Faction::Bot => settings.cols - 1 - col,
            };
            let row = (rng.next_u32() % settings.rows.max(1) as u32) as i32;
            let key = HexKey::new(col, row);
            if scenario.tile(key).occupant.is_some() {
                continue;
            }
            let type_id = UNIT_TYPES[rng.next_u32() as usize % UNIT_TYPES.len()];
            let strength = rng.range(20.0, 100.0);
            scenario.place(key, UnitSnapshot::new(type_id, faction).with_strength(strength));
            if faction == Faction::Bot
                && col >= settings.cols - flank / 2
                && let Some(tile) = scenario.tiles.get_mut(&key)
            {
                tile.recon = ReconStatus::Spotted;
            }
            placed += 1;
        }
    }
    scenario
}

/// Campaign map of the default strategic size with a few installations.
pub fn demo_campaign() -> CampaignScenario {
    let mut campaign = CampaignScenario::new(78, 48);
    campaign.tiles = vec![
        CampaignTile::new(CampaignTileKind::City, Faction::Player, 10, 20)
            .with_force(Force::new("Infantry_42", 6, "1st Rifles")),
        CampaignTile::new(CampaignTileKind::Airbase, Faction::Player, 14, 30)
            .with_force(Force::new("Fighter_P51", 4, "Fighter Wing")),
        CampaignTile::new(CampaignTileKind::Logistics, Faction::Player, 20, 12),
        CampaignTile::new(CampaignTileKind::FortificationHeavy, Faction::Bot, 50, 10)
            .with_force(Force::new("Artillery_155mm", 3, "Coastal Battery")),
        CampaignTile::new(CampaignTileKind::NavalBase, Faction::Bot, 60, 5)
            .with_force(Force::new("Destroyer", 2, "Escort Group")),
        CampaignTile::new(CampaignTileKind::FortificationLight, Faction::Bot, 45, 22),
    ];
    campaign
}

/// Startup system: renders both demo maps.
pub fn load_demo(
    settings: Res<DemoSettings>,
    mut battlefield: ResMut<ActiveBattlefield>,
    mut campaign: ResMut<ActiveCampaign>,
) {
    let scenario = demo_scenario(&settings);
    battlefield.0.render(&scenario);
    campaign.0.render(&demo_campaign());
    info!(
        cols = settings.cols,
        rows = settings.rows,
        seed = settings.seed,
        "demo loaded"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_is_deterministic_per_seed() {
        let settings = DemoSettings::default();
        assert_eq!(demo_scenario(&settings), demo_scenario(&settings));
        let other = DemoSettings {
            seed: 7,
            ..settings.clone()
        };
        assert_ne!(demo_scenario(&settings), demo_scenario(&other));
    }

    #[test]
    fn both_sides_deploy_on_their_flank() {
        let settings = DemoSettings::default();
        let scenario = demo_scenario(&settings);
        let units: Vec<_> = scenario
            .tiles
            .iter()
            .filter_map(|(key, tile)| tile.occupant.as_ref().map(|u| (*key, u.faction)))
            .collect();
        let flank = settings.cols / 3;
        for faction in [Faction::Player, Faction::Bot] {
            assert!(units.iter().any(|(_, f)| *f == faction));
        }
        for (key, faction) in units {
            match faction {
                Faction::Player => assert!(key.col < flank),
                Faction::Bot => assert!(key.col >= settings.cols - flank),
            }
        }
    }

    #[test]
    fn every_demo_unit_resolves() {
        use crate::catalog::{StaticCatalog, UnitCatalog};
        let catalog = StaticCatalog::new();
        for type_id in UNIT_TYPES {
            assert!(catalog.resolve(type_id).is_ok(), "{type_id}");
        }
        for tile in &demo_campaign().tiles {
            for force in &tile.forces {
                assert!(catalog.resolve(&force.unit_type).is_ok());
            }
        }
    }
}
