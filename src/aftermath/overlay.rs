use bevy::prelude::*;

use super::AftermathEntry;
use crate::battlefield::AftermathSettings;
use crate::coords::HexKey;
use crate::math::XorShift32;
use crate::scene::{NodeId, NodeRole, NodeSpec, SceneGraph, Shape};

/// Silhouette left behind by a destroyed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum WreckShape {
    /// Burnt-out vehicle hull.
    Hull,
    /// Scattered debris.
    Debris,
}

/// Draws the overlay for `entry` under `cell` and returns the group node.
///
/// Geometry comes from a generator seeded with the hex key, so redrawing the
/// same entry on the same hex always produces the same picture.
pub fn draw_overlay(
    scene: &mut dyn SceneGraph,
    cell: NodeId,
    key: HexKey,
    entry: &AftermathEntry,
    radius: f32,
    settings: &AftermathSettings,
) -> NodeId {
    let mut rng = XorShift32::new(key.seed());
    let group = scene.create(
        Some(cell),
        NodeSpec::new(NodeRole::Aftermath, Shape::Group).hex(key),
    );

    if let Some(shape) = entry.wreck_shape() {
        scene.set_tag(group, "wreck", true);
        let tilt = rng.range(-0.6, 0.6);
        let pieces = match shape {
            WreckShape::Hull => vec![hull(radius * 0.55, tilt)],
            WreckShape::Debris => (0..4)
                .map(|_| {
                    let center = Vec2::new(rng.range(-0.3, 0.3), rng.range(-0.2, 0.3)) * radius;
                    let size = radius * rng.range(0.06, 0.12);
                    shard(center, size, rng.range(0.0, std::f32::consts::TAU))
                })
                .collect(),
        };
        for piece in pieces {
            scene.create(
                Some(group),
                NodeSpec::new(NodeRole::Aftermath, Shape::Polygon(piece))
                    .hex(key)
                    .color(settings.wreck_color),
            );
        }
    }

    if entry.flames {
        scene.set_tag(group, "flames", true);
        let blades = 3 + rng.next_u32() % 3;
        for _ in 0..blades {
            let base = Vec2::new(rng.range(-0.25, 0.25) * radius, radius * 0.1);
            let height = radius * rng.range(0.25, 0.45);
            let width = radius * rng.range(0.06, 0.1);
            scene.create(
                Some(group),
                NodeSpec::new(
                    NodeRole::Aftermath,
                    Shape::Polygon(vec![
                        base + Vec2::new(-width, 0.0),
                        base + Vec2::new(rng.range(-0.3, 0.3) * width, -height),
                        base + Vec2::new(width, 0.0),
                    ]),
                )
                .hex(key)
                .color(settings.flame_color),
            );
        }
    }

    let puffs = 3 * entry.smoke.level() as u32;
    if puffs > 0 {
        scene.set_tag(group, &format!("smoke-{}", entry.smoke.level()), true);
    }
    for i in 0..puffs {
        let rise = (i as f32 + 1.0) / puffs as f32;
        scene.create(
            Some(group),
            NodeSpec::new(
                NodeRole::Aftermath,
                Shape::Circle {
                    radius: radius * rng.range(0.12, 0.22),
                },
            )
            .hex(key)
            .at(Vec2::new(
                rng.range(-0.3, 0.3) * radius,
                -rise * radius * 0.6,
            ))
            .color(settings.smoke_color)
            .opacity(settings.smoke_opacity * (1.0 - 0.4 * rise)),
        );
    }

    group
}

fn hull(length: f32, tilt: f32) -> Vec<Vec2> {
    let h = length * 0.4;
    let rot = Vec2::from_angle(tilt);
    [
        Vec2::new(-length / 2.0, -h / 2.0),
        Vec2::new(length / 2.0, -h / 2.0),
        Vec2::new(length / 2.0, h / 2.0),
        Vec2::new(-length / 2.0, h / 2.0),
    ]
    .into_iter()
    .map(|p| rot.rotate(p))
    .collect()
}

fn shard(center: Vec2, size: f32, angle: f32) -> Vec<Vec2> {
    (0..3)
        .map(|i| center + Vec2::from_angle(angle + i as f32 * 2.1) * size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aftermath::AftermathBook;
    use crate::catalog::UnitClass;
    use crate::scene::RetainedScene;

    fn draw(key: HexKey, book: &AftermathBook) -> Vec<Shape> {
        let mut scene = RetainedScene::new();
        let cell = scene.create(None, NodeSpec::new(NodeRole::HexCell, Shape::Group));
        let group = draw_overlay(
            &mut scene,
            cell,
            key,
            book.get(key).unwrap(),
            30.0,
            &AftermathSettings::default(),
        );
        scene
            .node(group)
            .unwrap()
            .children
            .iter()
            .map(|c| scene.node(*c).unwrap().shape.clone())
            .collect()
    }

    #[test]
    fn overlay_is_stable_per_hex() {
        let key = HexKey::new(5, 5);
        let mut book = AftermathBook::new();
        book.mark_wrecked(key, UnitClass::Tank, 2);
        assert_eq!(draw(key, &book), draw(key, &book));

        let other = HexKey::new(6, 5);
        book.mark_wrecked(other, UnitClass::Tank, 2);
        assert_ne!(draw(key, &book), draw(other, &book));
    }

    #[test]
    fn burnt_out_wreck_has_only_silhouette() {
        let key = HexKey::new(2, 2);
        let mut book = AftermathBook::new();
        book.mark_wrecked(key, UnitClass::Tank, 1);
        let burning = draw(key, &book).len();
        book.advance_turn();
        let cold = draw(key, &book);
        assert_eq!(cold.len(), 1);
        assert!(burning > cold.len());
    }
}
