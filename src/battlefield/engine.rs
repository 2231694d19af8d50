use bevy::log::{debug, error, info, warn};
use bevy::prelude::*;

use super::BattlefieldConfig;
use super::selection::{IDLE_TAG, SELECTED_TAG, SelectionState, ZoneKind};
use crate::aftermath::{AftermathBook, draw_overlay};
use crate::animation::{
    Anchor, CombatVisualProfile, Engagement, MoveBook, MoveHandle, NodeRef, PrimedMove, Scheduler,
    TaskId, TaskState, compose_attack,
};
use crate::catalog::{StaticCatalog, UnitCatalog, UnitClass, UnitTypeInfo};
use crate::coords::{self, HexKey};
use crate::registry::HexCellRegistry;
use crate::scenario::{Faction, ReconStatus, ScenarioData, UnitSnapshot};
use crate::scene::{NodeId, NodeRole, NodeSpec, Placement, RetainedScene, SceneGraph, Shape};
use crate::units::{self, FacingSource};

type HexClickHandler = Box<dyn FnMut(HexKey) + Send + Sync>;
type SelectionHandler = Box<dyn FnMut(&[HexKey]) + Send + Sync>;

/// The tactical battlefield renderer.
///
/// Owns the retained scene, the hex cell registry, aftermath state and the
/// animation scheduler. Every public method degrades to a logged no-op when
/// the hexes it needs are not rendered.
pub struct Battlefield {
    config: BattlefieldConfig,
    catalog: Box<dyn UnitCatalog>,
    scene: RetainedScene,
    registry: HexCellRegistry,
    aftermath: AftermathBook,
    scheduler: Scheduler,
    moves: MoveBook,
    selection: SelectionState,
    scenario: ScenarioData,
    cells_layer: Option<NodeId>,
    effects_layer: Option<NodeId>,
    on_click: Option<HexClickHandler>,
    on_selection: Option<SelectionHandler>,
}

impl Battlefield {
    /// Empty battlefield using `catalog` for unit lookups.
    pub fn new(config: BattlefieldConfig, catalog: impl UnitCatalog + 'static) -> Self {
        Self {
            config,
            catalog: Box::new(catalog),
            scene: RetainedScene::new(),
            registry: HexCellRegistry::new(),
            aftermath: AftermathBook::new(),
            scheduler: Scheduler::new(),
            moves: MoveBook::new(),
            selection: SelectionState::default(),
            scenario: ScenarioData::default(),
            cells_layer: None,
            effects_layer: None,
            on_click: None,
            on_selection: None,
        }
    }

    /// Empty battlefield with the name-based [`StaticCatalog`].
    pub fn with_default_catalog(config: BattlefieldConfig) -> Self {
        Self::new(config, StaticCatalog::new())
    }

    /// Active configuration.
    pub fn config(&self) -> &BattlefieldConfig {
        &self.config
    }

    /// Retained scene for drawing.
    pub fn scene(&self) -> &RetainedScene {
        &self.scene
    }

    /// Hex cell lookup of the current render.
    pub fn registry(&self) -> &HexCellRegistry {
        &self.registry
    }

    /// Aftermath entries.
    pub fn aftermath(&self) -> &AftermathBook {
        &self.aftermath
    }

    /// Animation scheduler (completion log, timing).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Selection, zone and idle highlight state.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Scenario of the last render.
    pub fn scenario(&self) -> &ScenarioData {
        &self.scenario
    }

    /// Scene state captured for an outstanding move.
    pub fn primed_move(&self, handle: MoveHandle) -> Option<&PrimedMove> {
        self.moves.primed(handle)
    }

    // ── rendering ──────────────────────────────────────────────────

    /// Rebuilds every hex, unit and overlay from `scenario`.
    ///
    /// Running effects are cancelled and the registry epoch moves on, so move
    /// handles primed before this call are stale. Aftermath entries on hexes
    /// that still exist are redrawn.
    pub fn render(&mut self, scenario: &ScenarioData) {
        self.scheduler.cancel_all(&mut self.scene);
        self.moves.prune(&self.scheduler);
        for layer in [self.cells_layer.take(), self.effects_layer.take()]
            .into_iter()
            .flatten()
        {
            self.scene.remove(layer);
        }
        self.scenario = scenario.clone();

        let grid = &self.config.grid;
        let outline = coords::hex_polygon(Vec2::ZERO, grid.hex_radius).to_vec();
        let cells = self
            .scene
            .create(None, NodeSpec::new(NodeRole::Layer, Shape::Group));
        for key in scenario.keys() {
            let tile = scenario.tile(key);
            let cell = self.scene.create(
                Some(cells),
                NodeSpec::new(NodeRole::HexCell, Shape::Group)
                    .hex(key)
                    .at(coords::offset_to_pixel(key, grid.hex_radius)),
            );
            self.scene.create(
                Some(cell),
                NodeSpec::new(NodeRole::HexPolygon, Shape::Polygon(outline.clone()))
                    .hex(key)
                    .color(tile.terrain.fill_color()),
            );
            if grid.show_labels {
                self.scene.create(
                    Some(cell),
                    NodeSpec::new(NodeRole::HexLabel, Shape::Label(key.to_string()))
                        .hex(key)
                        .at(Vec2::new(0.0, grid.hex_radius * 0.6))
                        .color(grid.label_color),
                );
            }
        }
        let effects = self
            .scene
            .create(None, NodeSpec::new(NodeRole::Layer, Shape::Group));
        self.cells_layer = Some(cells);
        self.effects_layer = Some(effects);
        self.registry.rebuild(&self.scene, scenario);

        self.aftermath.retain(|key| scenario.contains(key));
        let damaged: Vec<HexKey> = self.aftermath.iter().map(|(key, _)| key).collect();
        for key in damaged {
            if let Some(entry) = self.aftermath.get_mut(key) {
                entry.node = None;
            }
            self.sync_overlay(key);
        }

        let mut units = 0;
        for (key, tile) in &scenario.tiles {
            let Some(unit) = &tile.occupant else { continue };
            if tile.recon == ReconStatus::Hidden {
                continue;
            }
            let spotted = tile.recon == ReconStatus::Spotted;
            if self.render_unit(*key, unit, unit.faction, spotted) {
                units += 1;
            }
        }

        for key in self.selection.touched(&SelectionState::default()) {
            self.restyle(key);
        }

        info!(
            cells = self.registry.len(),
            units,
            aftermath = self.aftermath.len(),
            epoch = self.registry.epoch(),
            "battlefield rendered"
        );
    }

    /// Draws or redraws the unit stack on a hex.
    ///
    /// Returns `false` (and logs) when the hex is not rendered or the unit
    /// type has no sprite.
    pub fn render_unit(
        &mut self,
        key: HexKey,
        unit: &UnitSnapshot,
        faction: Faction,
        spotted_only: bool,
    ) -> bool {
        let info = match self.catalog.resolve(&unit.type_id) {
            Ok(info) => info,
            Err(err) => {
                error!(hex = %key, %err, "unit not drawn");
                return false;
            }
        };
        let radius = self.config.grid.hex_radius;
        let Some(cell) = self.registry.get_mut(key) else {
            warn!(hex = %key, "render_unit on a hex that is not rendered");
            return false;
        };
        units::draw_stack(
            &mut self.scene,
            cell,
            unit,
            info,
            faction,
            spotted_only,
            None,
            &self.config.units,
            radius,
        );
        self.restyle(key);
        true
    }

    /// Removes the unit stack (and transport vessel) from a hex.
    pub fn clear_unit(&mut self, key: HexKey) -> bool {
        let Some(cell) = self.registry.get_mut(key) else {
            warn!(hex = %key, "clear_unit on a hex that is not rendered");
            return false;
        };
        units::remove_stack(&mut self.scene, cell)
    }

    // ── movement ───────────────────────────────────────────────────

    /// Parks a ghost of the destination stack on `from` and hides the real
    /// stack, without starting the clock.
    pub fn prime_unit_move(&mut self, from: HexKey, to: HexKey) -> Option<MoveHandle> {
        let Some(origin) = self.registry.center(from) else {
            warn!(hex = %from, "move origin is not rendered");
            return None;
        };
        let Some(cell) = self.registry.get(to) else {
            warn!(hex = %to, "move destination is not rendered");
            return None;
        };
        let Some(stack) = cell.unit_stack else {
            warn!(hex = %to, "no unit stack at move destination");
            return None;
        };
        let destination = cell.center;
        let (faction, airborne) = cell
            .unit
            .as_ref()
            .map(|u| (u.faction, u.class().is_airborne()))
            .unwrap_or_default();

        let Some(ghost) = self.scene.clone_subtree(stack, self.effects_layer) else {
            warn!(hex = %to, "unit stack vanished before priming");
            return None;
        };
        let placement = self
            .scene
            .node(ghost)
            .map(|n| Placement {
                translation: origin,
                ..n.placement
            })
            .unwrap_or_else(|| Placement::at(origin));
        self.scene.set_placement(ghost, placement);
        self.scene.set_visible(stack, false);

        let mirror = units::resolve_mirror(
            Some(FacingSource::Movement(destination - origin)),
            faction,
        );
        units::mirror_icons(&mut self.scene, ghost, mirror);
        if let Some(cell) = self.registry.get_mut(to) {
            units::set_stack_mirror(&mut self.scene, cell, mirror);
        }

        let path = if airborne {
            let radius = self.config.grid.hex_radius;
            coords::hex_line(from.to_axial(), to.to_axial())
                .into_iter()
                .map(|hex| {
                    self.registry
                        .center(HexKey::from_axial(hex))
                        .unwrap_or_else(|| coords::axial_to_pixel(hex, radius))
                })
                .collect()
        } else {
            vec![origin, destination]
        };

        Some(self.moves.insert(
            PrimedMove {
                from,
                to,
                ghost,
                destination: Some(stack),
                path,
            },
            self.registry.epoch(),
        ))
    }

    /// Starts a primed move. Stale or disposed handles return `None`.
    pub fn play_move(&mut self, handle: MoveHandle, duration_ms: f32) -> Option<TaskId> {
        let epoch = self.registry.epoch();
        self.moves
            .play(handle, duration_ms, epoch, &mut self.scheduler, &mut self.scene)
    }

    /// Cancels or discards a move; `true` only on the first call.
    pub fn dispose_move(&mut self, handle: MoveHandle) -> bool {
        self.moves
            .dispose(handle, &mut self.scheduler, &mut self.scene)
    }

    /// Disposes every outstanding move handle.
    pub fn dispose_all_moves(&mut self) {
        self.moves.dispose_all(&mut self.scheduler, &mut self.scene);
    }

    /// Primes and plays a move in one call.
    pub fn animate_unit_move(
        &mut self,
        from: HexKey,
        to: HexKey,
        duration_ms: f32,
    ) -> Option<TaskId> {
        let handle = self.prime_unit_move(from, to)?;
        self.play_move(handle, duration_ms)
    }

    // ── combat ─────────────────────────────────────────────────────

    /// Plays the attack from `attacker` on `defender`.
    ///
    /// The returned task finishes after every sub-effect. Missing hexes only
    /// drop the effects anchored on them.
    pub fn play_attack_sequence(
        &mut self,
        attacker: HexKey,
        defender: HexKey,
        hard_target: bool,
    ) -> TaskId {
        let a = self.registry.get(attacker);
        let d = self.registry.get(defender);
        if a.is_none() && d.is_none() {
            warn!(%attacker, %defender, "attack between hexes that are not rendered");
            return self.scheduler.resolved("attack");
        }

        let attacker_info = a
            .and_then(|c| c.unit.as_ref())
            .map(|u| u.info.clone())
            .unwrap_or_else(|| {
                debug!(hex = %attacker, "no attacker unit drawn; using infantry visuals");
                UnitTypeInfo::of_class(UnitClass::Infantry)
            });
        let defender_class = d
            .and_then(|c| c.unit.as_ref())
            .map(|u| u.class())
            .unwrap_or_default();

        let engagement = Engagement {
            attacker,
            defender,
            from: Anchor::new(attacker, a.map(|c| c.center)),
            to: Anchor::new(defender, d.map(|c| c.center)),
            attacker_stack: NodeRef::new(attacker, a.and_then(|c| c.unit_stack)),
            attacker_polygon: NodeRef::new(attacker, a.and_then(|c| c.polygon)),
            defender_stack: NodeRef::new(defender, d.and_then(|c| c.unit_stack)),
            defender_polygon: NodeRef::new(defender, d.and_then(|c| c.polygon)),
            layer: self.effects_layer,
            hex_radius: self.config.grid.hex_radius,
        };
        let profile = CombatVisualProfile::derive(&attacker_info, defender_class, hard_target);
        debug!(
            %attacker,
            %defender,
            archetype = ?profile.archetype,
            hard_target,
            "attack composed"
        );
        compose_attack(
            &mut self.scheduler,
            &engagement,
            &profile,
            &self.config.animation,
        )
    }

    // ── aftermath ──────────────────────────────────────────────────

    /// Smoke (and flames when critical) on a damaged vehicle's hex.
    /// Non-vehicle classes leave no trace and return `false`.
    pub fn mark_hex_damaged(
        &mut self,
        key: HexKey,
        class: UnitClass,
        strength_after: f32,
        turns: u32,
    ) -> bool {
        if !self.aftermath.mark_damaged(key, class, strength_after, turns) {
            debug!(hex = %key, ?class, "no aftermath for this class");
            return false;
        }
        self.sync_overlay(key);
        true
    }

    /// Wreck (burning for vehicles) on a hex.
    pub fn mark_hex_wrecked(&mut self, key: HexKey, class: UnitClass, fire_turns: u32) {
        self.aftermath.mark_wrecked(key, class, fire_turns);
        self.sync_overlay(key);
    }

    /// Ages all aftermath by one game turn.
    pub fn advance_aftermath_turn(&mut self) {
        let report = self.aftermath.advance_turn();
        for (key, node) in report.expired {
            if let Some(node) = node {
                self.scene.remove(node);
            }
            if let Some(cell) = self.registry.get_mut(key) {
                cell.aftermath = None;
            }
        }
        for key in report.changed {
            self.sync_overlay(key);
        }
    }

    /// Removes the aftermath of one hex, wrecks included.
    pub fn clear_aftermath(&mut self, key: HexKey) -> bool {
        let Some(entry) = self.aftermath.clear(key) else {
            return false;
        };
        if let Some(node) = entry.node {
            self.scene.remove(node);
        }
        if let Some(cell) = self.registry.get_mut(key) {
            cell.aftermath = None;
        }
        true
    }

    /// Removes all aftermath.
    pub fn reset_aftermath(&mut self) {
        for (key, entry) in self.aftermath.reset() {
            if let Some(node) = entry.node {
                self.scene.remove(node);
            }
            if let Some(cell) = self.registry.get_mut(key) {
                cell.aftermath = None;
            }
        }
    }

    fn sync_overlay(&mut self, key: HexKey) {
        let radius = self.config.grid.hex_radius;
        let Some(entry) = self.aftermath.get_mut(key) else {
            return;
        };
        if let Some(old) = entry.node.take() {
            self.scene.remove(old);
        }
        let Some(cell) = self.registry.get_mut(key) else {
            warn!(hex = %key, "aftermath on a hex that is not rendered; overlay deferred");
            return;
        };
        let node = draw_overlay(
            &mut self.scene,
            cell.node,
            key,
            entry,
            radius,
            &self.config.aftermath,
        );
        entry.node = Some(node);
        cell.aftermath = Some(node);
    }

    // ── selection ──────────────────────────────────────────────────

    /// Replaces the selected hexes. Unrendered keys are ignored. Notifies the
    /// selection handler when the selection changed.
    pub fn apply_hex_selection(&mut self, keys: &[HexKey]) -> bool {
        let previous = self.selection.clone();
        let known: Vec<HexKey> = keys
            .iter()
            .copied()
            .filter(|key| {
                let found = self.registry.get(*key).is_some();
                if !found {
                    warn!(hex = %key, "cannot select a hex that is not rendered");
                }
                found
            })
            .collect();
        if !self.selection.select(known) {
            return false;
        }
        for key in self.selection.touched(&previous) {
            self.restyle(key);
        }
        let selected: Vec<HexKey> = self.selection.selected.iter().copied().collect();
        if let Some(handler) = self.on_selection.as_mut() {
            handler(&selected);
        }
        true
    }

    /// Replaces all zone overlays.
    pub fn set_zone_highlights(&mut self, zones: impl IntoIterator<Item = (HexKey, ZoneKind)>) {
        let previous = self.selection.clone();
        self.selection.zones = zones.into_iter().collect();
        for key in self.selection.touched(&previous) {
            self.restyle(key);
        }
    }

    /// Toggles the idle-unit highlight. Turning it on marks `idle`; turning it
    /// off clears every mark. Returns whether the highlight is now shown.
    pub fn toggle_idle_unit_highlight(&mut self, idle: &[HexKey]) -> bool {
        let previous = self.selection.clone();
        if self.selection.idle_visible {
            self.selection.idle_visible = false;
            self.selection.idle.clear();
        } else {
            self.selection.idle_visible = true;
            self.selection.idle = idle.iter().copied().collect();
        }
        for key in self.selection.touched(&previous) {
            self.restyle(key);
        }
        self.selection.idle_visible
    }

    fn restyle(&mut self, key: HexKey) {
        let Some(cell) = self.registry.get(key) else {
            return;
        };
        if let Some(polygon) = cell.polygon {
            self.scene
                .set_tag(polygon, SELECTED_TAG, self.selection.selected.contains(&key));
            let zone = self.selection.zones.get(&key).copied();
            for kind in ZoneKind::ALL {
                self.scene.set_tag(polygon, kind.tag(), zone == Some(kind));
            }
        }
        if let Some(stack) = cell.unit_stack {
            let idle = self.selection.idle_visible && self.selection.idle.contains(&key);
            self.scene.set_tag(stack, IDLE_TAG, idle);
        }
    }

    // ── input ──────────────────────────────────────────────────────

    /// Registers the hex click handler (replaces any previous one).
    pub fn on_hex_click(&mut self, handler: impl FnMut(HexKey) + Send + Sync + 'static) {
        self.on_click = Some(Box::new(handler));
    }

    /// Registers the selection-changed handler (replaces any previous one).
    pub fn on_selection_changed(
        &mut self,
        handler: impl FnMut(&[HexKey]) + Send + Sync + 'static,
    ) {
        self.on_selection = Some(Box::new(handler));
    }

    /// Resolves a scene-space click to a rendered hex and notifies the click
    /// handler.
    pub fn handle_click(&mut self, point: Vec2) -> Option<HexKey> {
        let hex = coords::pixel_to_axial(point, self.config.grid.hex_radius);
        let key = HexKey::from_axial(hex);
        self.registry.get(key)?;
        if let Some(handler) = self.on_click.as_mut() {
            handler(key);
        }
        Some(key)
    }

    // ── clock ──────────────────────────────────────────────────────

    /// Advances every running effect by `dt_ms`.
    pub fn tick(&mut self, dt_ms: f32) {
        self.scheduler.tick(dt_ms, &mut self.scene);
        self.moves.prune(&self.scheduler);
    }

    /// Any effect pending or running.
    pub fn is_animating(&self) -> bool {
        !self.scheduler.is_idle()
    }

    /// State of a task, including recently pruned ones.
    pub fn task_status(&self, id: TaskId) -> Option<TaskState> {
        self.scheduler.status(id).or_else(|| {
            self.scheduler
                .completion_log()
                .find(|c| c.task == id)
                .map(|c| c.state)
        })
    }
}
