//! Hex Cell Registry: hex key → rendered cell node and derived geometry.
//!
//! Rebuilt by scanning the scene after every full render. Each rebuild bumps
//! the epoch, so anything holding data from an earlier render (move handles in
//! particular) can tell it is stale.

use std::collections::HashMap;

use bevy::log::debug;
use bevy::math::Vec2;

use crate::coords::HexKey;
use crate::scenario::{ReconStatus, ScenarioData, TerrainType};
use crate::scene::{NodeId, NodeRole, SceneGraph};
use crate::units::RenderedUnit;

/// Cached data for one rendered hex.
#[derive(Debug, Clone)]
pub struct HexCell {
    /// Cell identity.
    pub key: HexKey,
    /// The per-hex container node.
    pub node: NodeId,
    /// Outline/fill polygon.
    pub polygon: Option<NodeId>,
    /// Label sub-element.
    pub label: Option<NodeId>,
    /// Absolute pixel center.
    pub center: Vec2,
    /// Terrain id from the scenario.
    pub terrain_id: String,
    /// Terrain category.
    pub terrain: TerrainType,
    /// Recon status.
    pub recon: ReconStatus,
    /// Unit stack node, if a unit is drawn.
    pub unit_stack: Option<NodeId>,
    /// Transport vessel node beneath the stack.
    pub boat: Option<NodeId>,
    /// Aftermath overlay node.
    pub aftermath: Option<NodeId>,
    /// The unit last drawn here.
    pub unit: Option<RenderedUnit>,
}

/// Lookup of rendered cells; valid only between two renders.
#[derive(Debug, Default)]
pub struct HexCellRegistry {
    cells: HashMap<HexKey, HexCell>,
    epoch: u64,
}

impl HexCellRegistry {
    /// Empty registry at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch; bumped by every [`HexCellRegistry::rebuild`] and
    /// [`HexCellRegistry::clear`].
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of cached cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell for a key.
    pub fn get(&self, key: HexKey) -> Option<&HexCell> {
        self.cells.get(&key)
    }

    /// Mutable cell for a key.
    pub fn get_mut(&mut self, key: HexKey) -> Option<&mut HexCell> {
        self.cells.get_mut(&key)
    }

    /// Pixel center of a cell.
    pub fn center(&self, key: HexKey) -> Option<Vec2> {
        self.cells.get(&key).map(|c| c.center)
    }

    /// All cached cells.
    pub fn cells(&self) -> impl Iterator<Item = &HexCell> {
        self.cells.values()
    }

    /// Drops every cached reference and invalidates outstanding handles.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.epoch += 1;
    }

    /// Rebuilds the lookup by scanning `scene` for hex cell nodes.
    ///
    /// Terrain attributes come from `scenario`; child visuals already attached
    /// to a cell (units, boats, overlays) are picked up by role.
    pub fn rebuild(&mut self, scene: &dyn SceneGraph, scenario: &ScenarioData) {
        self.clear();

        for id in scene.ids() {
            let Some(node) = scene.node(id) else { continue };
            if node.role != NodeRole::HexCell {
                continue;
            }
            let Some(key) = node.hex else { continue };
            let Some(center) = scene.world_position(id) else {
                continue;
            };
            let tile = scenario.tile(key);

            let mut cell = HexCell {
                key,
                node: id,
                polygon: None,
                label: None,
                center,
                terrain_id: tile.terrain_id,
                terrain: tile.terrain,
                recon: tile.recon,
                unit_stack: None,
                boat: None,
                aftermath: None,
                unit: None,
            };
            for &child in &node.children {
                let Some(child_node) = scene.node(child) else {
                    continue;
                };
                let slot = match child_node.role {
                    NodeRole::HexPolygon => &mut cell.polygon,
                    NodeRole::HexLabel => &mut cell.label,
                    NodeRole::UnitStack => &mut cell.unit_stack,
                    NodeRole::Boat => &mut cell.boat,
                    NodeRole::Aftermath => &mut cell.aftermath,
                    _ => continue,
                };
                *slot = Some(child);
            }
            self.cells.insert(key, cell);
        }

        debug!(cells = self.cells.len(), epoch = self.epoch, "hex registry rebuilt");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeSpec, RetainedScene, Shape};

    fn scene_with_cell(key: HexKey, at: Vec2) -> (RetainedScene, NodeId) {
        let mut scene = RetainedScene::new();
        let layer = scene.create(None, NodeSpec::new(NodeRole::Layer, Shape::Group));
        let cell = scene.create(
            Some(layer),
            NodeSpec::new(NodeRole::HexCell, Shape::Group).hex(key).at(at),
        );
        scene.create(
            Some(cell),
            NodeSpec::new(NodeRole::HexPolygon, Shape::Polygon(vec![])).hex(key),
        );
        scene.create(
            Some(cell),
            NodeSpec::new(NodeRole::Boat, Shape::Group).hex(key),
        );
        (scene, cell)
    }

    #[test]
    fn rebuild_finds_cells_and_children() {
        let key = HexKey::new(2, 3);
        let (scene, cell) = scene_with_cell(key, Vec2::new(30.0, 40.0));
        let mut scenario = ScenarioData::new(5, 5);
        scenario.set_terrain(key, TerrainType::Sea);

        let mut registry = HexCellRegistry::new();
        registry.rebuild(&scene, &scenario);

        let found = registry.get(key).unwrap();
        assert_eq!(found.node, cell);
        assert_eq!(found.center, Vec2::new(30.0, 40.0));
        assert_eq!(found.terrain, TerrainType::Sea);
        assert!(found.polygon.is_some());
        assert!(found.boat.is_some());
        assert!(found.unit_stack.is_none());
    }

    #[test]
    fn missing_key_is_not_found() {
        let registry = HexCellRegistry::new();
        assert!(registry.get(HexKey::new(0, 0)).is_none());
        assert!(registry.center(HexKey::new(0, 0)).is_none());
    }

    #[test]
    fn every_rebuild_bumps_epoch() {
        let (scene, _) = scene_with_cell(HexKey::new(0, 0), Vec2::ZERO);
        let scenario = ScenarioData::new(1, 1);
        let mut registry = HexCellRegistry::new();
        registry.rebuild(&scene, &scenario);
        let first = registry.epoch();
        registry.rebuild(&scene, &scenario);
        assert!(registry.epoch() > first);

        registry.clear();
        assert!(registry.is_empty());
    }
}
