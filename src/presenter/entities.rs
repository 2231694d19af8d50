use bevy::prelude::*;

use crate::animation::{TaskId, TaskState};
use crate::battlefield::{
    AftermathSettings, Battlefield, BattlefieldConfig, GridSettings, IDLE_TAG, SELECTED_TAG,
    ZoneKind,
};
use crate::campaign::CampaignMap;
use crate::coords::HexKey;
use crate::scenario::UnitSnapshot;
use crate::scene::{NodeId, NodeRole, RetainedScene, SceneGraph, Shape};

/// The battlefield the app is showing.
#[derive(Resource)]
pub struct ActiveBattlefield(pub Battlefield);

impl FromWorld for ActiveBattlefield {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<BattlefieldConfig>()
            .cloned()
            .unwrap_or_default();
        Self(Battlefield::with_default_catalog(config))
    }
}

/// The strategic map the app can switch to.
#[derive(Resource)]
pub struct ActiveCampaign(pub CampaignMap);

impl FromWorld for ActiveCampaign {
    fn from_world(world: &mut World) -> Self {
        let settings = world
            .get_resource::<BattlefieldConfig>()
            .map(|c| c.campaign.clone())
            .unwrap_or_default();
        Self(CampaignMap::new(settings))
    }
}

/// Which scene is drawn and receives clicks.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ViewMode {
    /// Tactical battlefield.
    #[default]
    Tactical,
    /// Strategic campaign map.
    Campaign,
}

/// A hit waiting for its attack animation to finish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingHit {
    /// Join task of the attack sequence.
    pub join: TaskId,
    /// Defending hex.
    pub target: HexKey,
    /// Strength the defender loses.
    pub damage: f32,
}

/// Hits applied once their attack sequence is over.
#[derive(Resource, Default, Debug)]
pub struct PendingHits(pub Vec<PendingHit>);

/// What a resolved hit did to the defender.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    /// No unit left on the hex.
    Missed,
    /// The unit survives with this strength.
    Damaged(f32),
    /// The unit was destroyed and left a wreck.
    Destroyed,
}

/// Takes `hit.damage` off the defender's strength, redraws the stack and
/// records the aftermath. A unit that reaches zero is removed and wrecked.
pub fn apply_hit(
    bf: &mut Battlefield,
    hit: &PendingHit,
    settings: &AftermathSettings,
) -> HitOutcome {
    let Some(unit) = bf.registry().get(hit.target).and_then(|c| c.unit.clone()) else {
        return HitOutcome::Missed;
    };
    let class = unit.class();
    let strength = (unit.snapshot.strength - hit.damage).max(0.0);
    if strength <= 0.0 {
        bf.clear_unit(hit.target);
        bf.mark_hex_wrecked(hit.target, class, settings.fire_turns);
        return HitOutcome::Destroyed;
    }
    let snapshot = UnitSnapshot {
        strength,
        ..unit.snapshot
    };
    bf.render_unit(hit.target, &snapshot, unit.faction, unit.spotted_only);
    bf.mark_hex_damaged(hit.target, class, strength, settings.damage_turns);
    HitOutcome::Damaged(strength)
}

/// Applies every hit whose attack has finished; the rest stay queued.
pub fn resolve_finished_hits(
    bf: &mut Battlefield,
    hits: &mut Vec<PendingHit>,
    settings: &AftermathSettings,
) -> Vec<(HexKey, HitOutcome)> {
    let (done, waiting): (Vec<_>, Vec<_>) = hits
        .drain(..)
        .partition(|hit| bf.task_status(hit.join).is_none_or(TaskState::is_finished));
    *hits = waiting;
    done.iter()
        .map(|hit| (hit.target, apply_hit(bf, hit, settings)))
        .collect()
}

/// Marker for the top-down battle camera.
#[derive(Component, Reflect)]
pub struct BattleCamera;

/// One node resolved to absolute scene space, ready to draw.
#[derive(Debug, Clone)]
pub struct DrawItem {
    /// Source node.
    pub id: NodeId,
    /// Node role.
    pub role: NodeRole,
    /// Hex the node belongs to.
    pub hex: Option<HexKey>,
    /// Geometry in local space.
    pub shape: Shape,
    /// Absolute origin.
    pub origin: Vec2,
    /// Accumulated scale.
    pub scale: f32,
    /// Accumulated horizontal mirror.
    pub mirror: bool,
    /// Node color with accumulated opacity applied to alpha.
    pub color: Color,
    /// Visual-state tags of the node.
    pub tags: Vec<String>,
}

impl DrawItem {
    /// Maps a local point of the shape to absolute scene space.
    pub fn point(&self, local: Vec2) -> Vec2 {
        let x = if self.mirror { -local.x } else { local.x };
        self.origin + Vec2::new(x, local.y) * self.scale
    }

    /// Whether the node carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Resolves every shown node depth-first in child order.
///
/// Translations add up like [`crate::scene::SceneGraph::world_position`];
/// scale, mirror and opacity are inherited. Hidden subtrees are skipped.
pub fn flatten(scene: &RetainedScene) -> Vec<DrawItem> {
    let mut items = Vec::new();
    let mut stack: Vec<(NodeId, Vec2, f32, bool, f32)> = scene
        .iter()
        .filter(|(_, node)| node.parent.is_none())
        .map(|(id, _)| (id, Vec2::ZERO, 1.0, false, 1.0))
        .collect();
    stack.reverse();

    while let Some((id, base, scale, mirror, opacity)) = stack.pop() {
        let Some(node) = scene.node(id) else {
            continue;
        };
        if !node.visible {
            continue;
        }
        let origin = base + node.placement.translation;
        let scale = scale * node.placement.scale;
        let mirror = mirror ^ node.placement.mirror_x;
        let opacity = opacity * node.opacity;
        let alpha = node.color.alpha() * opacity;
        items.push(DrawItem {
            id,
            role: node.role,
            hex: node.hex,
            shape: node.shape.clone(),
            origin,
            scale,
            mirror,
            color: node.color.with_alpha(alpha),
            tags: node.tags.iter().cloned().collect(),
        });
        for child in node.children.iter().rev() {
            stack.push((*child, origin, scale, mirror, opacity));
        }
    }
    items
}

/// Stroke color for an item after visual-state tags.
pub fn stroke_color(item: &DrawItem, grid: &GridSettings) -> Color {
    if item.has_tag(SELECTED_TAG) {
        return grid.selection_color;
    }
    if item.has_tag(crate::animation::combat::FLASH_TAG) {
        return Color::WHITE;
    }
    if let Some(kind) = ZoneKind::ALL.into_iter().find(|k| item.has_tag(k.tag())) {
        return zone_color(kind);
    }
    if item.has_tag(IDLE_TAG) {
        return Color::srgb(1.0, 0.8, 0.2);
    }
    item.color
}

fn zone_color(kind: ZoneKind) -> Color {
    match kind {
        ZoneKind::Move => Color::srgb(0.3, 0.6, 1.0),
        ZoneKind::Attack => Color::srgb(1.0, 0.3, 0.25),
        ZoneKind::Deploy => Color::srgb(0.35, 0.9, 0.4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeSpec, Placement};

    fn group(role: NodeRole) -> NodeSpec {
        NodeSpec::new(role, Shape::Group)
    }

    #[test]
    fn translations_and_opacity_accumulate() {
        let mut scene = RetainedScene::new();
        let root = scene.create(
            None,
            group(NodeRole::Layer).at(Vec2::new(10.0, 0.0)).opacity(0.5),
        );
        let child = scene.create(
            Some(root),
            NodeSpec::new(NodeRole::Effect, Shape::Circle { radius: 2.0 })
                .at(Vec2::new(0.0, 5.0))
                .opacity(0.5),
        );
        let items = flatten(&scene);
        let item = items.iter().find(|i| i.id == child).unwrap();
        assert_eq!(item.origin, Vec2::new(10.0, 5.0));
        assert!((item.color.alpha() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn hidden_subtrees_are_skipped() {
        let mut scene = RetainedScene::new();
        let root = scene.create(None, group(NodeRole::Layer));
        let hidden = scene.create(Some(root), group(NodeRole::UnitStack));
        scene.create(Some(hidden), group(NodeRole::UnitIcon));
        scene.set_visible(hidden, false);
        let items = flatten(&scene);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, root);
    }

    #[test]
    fn children_follow_parents_in_order() {
        let mut scene = RetainedScene::new();
        let cells = scene.create(None, group(NodeRole::Layer));
        let a = scene.create(Some(cells), group(NodeRole::HexCell));
        let b = scene.create(Some(cells), group(NodeRole::HexCell));
        let effects = scene.create(None, group(NodeRole::Layer));
        let order: Vec<NodeId> = flatten(&scene).into_iter().map(|i| i.id).collect();
        assert_eq!(order, vec![cells, a, b, effects]);
    }

    #[test]
    fn mirror_flips_local_x() {
        let mut scene = RetainedScene::new();
        let icon = scene.create(
            None,
            group(NodeRole::UnitIcon).placement(Placement {
                translation: Vec2::ZERO,
                scale: 2.0,
                mirror_x: true,
            }),
        );
        let item = flatten(&scene).into_iter().find(|i| i.id == icon).unwrap();
        assert_eq!(item.point(Vec2::new(1.0, 1.0)), Vec2::new(-2.0, 2.0));
    }

    #[test]
    fn selection_wins_over_zone_tint() {
        let mut scene = RetainedScene::new();
        let poly = scene.create(None, group(NodeRole::HexPolygon));
        scene.set_tag(poly, ZoneKind::Attack.tag(), true);
        let grid = GridSettings::default();
        let item = flatten(&scene).remove(0);
        assert_eq!(stroke_color(&item, &grid), zone_color(ZoneKind::Attack));

        scene.set_tag(poly, SELECTED_TAG, true);
        let item = flatten(&scene).remove(0);
        assert_eq!(stroke_color(&item, &grid), grid.selection_color);
    }

    // ── hits ──

    fn front() -> Battlefield {
        use crate::scenario::{Faction, ScenarioData};
        let mut scenario = ScenarioData::new(6, 4);
        scenario
            .place(HexKey::new(0, 1), UnitSnapshot::new("Infantry_42", Faction::Player))
            .place(
                HexKey::new(4, 1),
                UnitSnapshot::new("Tank_IV", Faction::Bot).with_strength(70.0),
            );
        let mut bf = Battlefield::with_default_catalog(BattlefieldConfig::default());
        bf.render(&scenario);
        bf
    }

    #[test]
    fn hits_wait_for_their_attack() {
        let mut bf = front();
        let settings = AftermathSettings::default();
        let target = HexKey::new(4, 1);
        let join = bf.play_attack_sequence(HexKey::new(0, 1), target, true);
        let mut hits = vec![PendingHit {
            join,
            target,
            damage: 30.0,
        }];

        assert!(resolve_finished_hits(&mut bf, &mut hits, &settings).is_empty());
        assert_eq!(hits.len(), 1);

        while bf.is_animating() {
            bf.tick(16.0);
        }
        let outcomes = resolve_finished_hits(&mut bf, &mut hits, &settings);
        assert_eq!(outcomes, vec![(target, HitOutcome::Damaged(40.0))]);
        assert!(hits.is_empty());

        let unit = bf.registry().get(target).unwrap().unit.clone().unwrap();
        assert_eq!(unit.snapshot.strength, 40.0);
        assert_eq!(unit.count, 2);
        let entry = bf.aftermath().get(target).unwrap();
        assert!(entry.flames && !entry.wreck);
    }

    #[test]
    fn lethal_hit_wrecks_with_configured_fire_turns() {
        let mut bf = front();
        let settings = AftermathSettings {
            fire_turns: 5,
            ..AftermathSettings::default()
        };
        let target = HexKey::new(4, 1);
        let join = bf.play_attack_sequence(HexKey::new(0, 1), target, true);
        let hit = PendingHit {
            join,
            target,
            damage: 100.0,
        };
        assert_eq!(apply_hit(&mut bf, &hit, &settings), HitOutcome::Destroyed);
        assert!(bf.registry().get(target).unwrap().unit.is_none());
        let entry = bf.aftermath().get(target).unwrap();
        assert!(entry.wreck);
        assert_eq!(entry.fire_turns_remaining, 5);

        assert_eq!(apply_hit(&mut bf, &hit, &settings), HitOutcome::Missed);
    }
}
