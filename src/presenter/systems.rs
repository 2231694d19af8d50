use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::log::{debug, info};
use bevy::post_process::bloom::{Bloom, BloomCompositeMode};
use bevy::prelude::*;
use bevy::render::view::Hdr;
use bevy::window::PrimaryWindow;
use bevy_egui::egui;

use super::entities::{
    ActiveBattlefield, ActiveCampaign, BattleCamera, DrawItem, HitOutcome, PendingHit,
    PendingHits, ViewMode, flatten, resolve_finished_hits, stroke_color,
};
use super::{to_scene, to_world};
use crate::battlefield::{BattlefieldConfig, GridSettings};
use crate::scenario::Faction;
use crate::scene::{NodeRole, RetainedScene, Shape};

const CAMERA_HEIGHT: f32 = 30.0;
const PAN_SPEED: f32 = 0.8;
const ZOOM_SPEED: f32 = 20.0;
const CIRCLE_SEGMENTS: usize = 20;
const HIT_DAMAGE: f32 = 35.0;

fn active_scene<'a>(
    mode: ViewMode,
    battlefield: &'a ActiveBattlefield,
    campaign: &'a ActiveCampaign,
) -> &'a RetainedScene {
    match mode {
        ViewMode::Tactical => battlefield.0.scene(),
        ViewMode::Campaign => campaign.0.scene(),
    }
}

fn focus_point(scene: &RetainedScene) -> Vec2 {
    let centers: Vec<Vec2> = flatten(scene)
        .into_iter()
        .filter(|item| item.role == NodeRole::HexCell)
        .map(|item| item.origin)
        .collect();
    if centers.is_empty() {
        return Vec2::ZERO;
    }
    centers.iter().sum::<Vec2>() / centers.len() as f32
}

fn look_down_at(focus: Vec2, height: f32) -> Transform {
    let target = to_world(focus);
    Transform::from_translation(target + Vec3::Y * height).looking_at(target, Vec3::NEG_Z)
}

// ── Startup ────────────────────────────────────────────────────────

/// Spawns the top-down camera over the rendered battlefield.
pub fn setup_camera(mut commands: Commands, battlefield: Res<ActiveBattlefield>) {
    let focus = focus_point(battlefield.0.scene());
    commands.spawn((
        Name::new("Battle Camera"),
        Camera3d::default(),
        Hdr,
        Tonemapping::TonyMcMapface,
        Bloom {
            intensity: 0.2,
            composite_mode: BloomCompositeMode::Additive,
            ..Bloom::NATURAL
        },
        look_down_at(focus, CAMERA_HEIGHT),
        BattleCamera,
    ));
}

// ── Update: clock and drawing ──────────────────────────────────────

/// Advances running effects by the frame time.
pub fn tick_battlefield(time: Res<Time>, mut battlefield: ResMut<ActiveBattlefield>) {
    battlefield.0.tick(time.delta_secs() * 1000.0);
}

/// Applies queued hits once their attack sequence has played out.
pub fn resolve_hits(
    config: Res<BattlefieldConfig>,
    mut hits: ResMut<PendingHits>,
    mut battlefield: ResMut<ActiveBattlefield>,
) {
    if hits.0.is_empty() {
        return;
    }
    let outcomes = resolve_finished_hits(&mut battlefield.0, &mut hits.0, &config.aftermath);
    for (hex, outcome) in outcomes {
        match outcome {
            HitOutcome::Destroyed => info!(%hex, "unit destroyed"),
            HitOutcome::Damaged(strength) => debug!(%hex, strength, "unit hit"),
            HitOutcome::Missed => {}
        }
    }
}

/// Draws the active scene with gizmos.
pub fn draw_scene(
    mut gizmos: Gizmos,
    mode: Res<ViewMode>,
    battlefield: Res<ActiveBattlefield>,
    campaign: Res<ActiveCampaign>,
    config: Res<BattlefieldConfig>,
) {
    let scene = active_scene(*mode, &battlefield, &campaign);
    for item in flatten(scene) {
        draw_item(&mut gizmos, &item, &config.grid);
    }
}

fn draw_item(gizmos: &mut Gizmos, item: &DrawItem, grid: &GridSettings) {
    let color = stroke_color(item, grid);
    match &item.shape {
        Shape::Group | Shape::Label(_) => {}
        Shape::Polygon(points) => {
            outline(gizmos, item, points, 1.0, color);
            if item.role == NodeRole::HexPolygon {
                outline(gizmos, item, points, 0.97, grid.outline_color);
                for inset in [0.75, 0.5] {
                    outline(gizmos, item, points, inset, item.color);
                }
            }
        }
        Shape::Circle { radius } => {
            let ring: Vec<Vec2> = (0..CIRCLE_SEGMENTS)
                .map(|i| {
                    let a = std::f32::consts::TAU * i as f32 / CIRCLE_SEGMENTS as f32;
                    Vec2::from_angle(a) * *radius
                })
                .collect();
            outline(gizmos, item, &ring, 1.0, color);
        }
        Shape::Line { to, .. } => {
            gizmos.line(
                to_world(item.point(Vec2::ZERO)),
                to_world(item.point(*to)),
                color,
            );
        }
        Shape::Icon { size, .. } => {
            let h = size * 0.5;
            let body = [
                Vec2::new(-h, -h * 0.6),
                Vec2::new(h, -h * 0.6),
                Vec2::new(h, h * 0.6),
                Vec2::new(-h, h * 0.6),
            ];
            outline(gizmos, item, &body, 1.0, color);
            // Facing nose; drawn facing right before mirroring.
            gizmos.line(
                to_world(item.point(Vec2::ZERO)),
                to_world(item.point(Vec2::new(h * 1.2, 0.0))),
                color,
            );
        }
    }
}

fn outline(gizmos: &mut Gizmos, item: &DrawItem, points: &[Vec2], inset: f32, color: Color) {
    let closed = points
        .iter()
        .chain(points.first())
        .map(|p| to_world(item.point(*p * inset)));
    gizmos.linestrip(closed, color);
}

// ── Update: input ──────────────────────────────────────────────────

/// WASD pans, Q/E zooms.
pub fn pan_camera(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mut query: Query<&mut Transform, With<BattleCamera>>,
) {
    let Ok(mut transform) = query.single_mut() else {
        return;
    };
    let mut direction = Vec3::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        direction.z -= 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        direction.z += 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        direction.x += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        direction.x -= 1.0;
    }
    let dt = time.delta_secs();
    if direction != Vec3::ZERO {
        let speed = PAN_SPEED * transform.translation.y;
        transform.translation += direction.normalize() * speed * dt;
    }
    if keys.pressed(KeyCode::KeyQ) {
        transform.translation.y += ZOOM_SPEED * dt;
    }
    if keys.pressed(KeyCode::KeyE) {
        transform.translation.y = (transform.translation.y - ZOOM_SPEED * dt).max(2.0);
    }
}

/// Left click selects; right click attacks from the selected hex; shift +
/// right click moves the selected unit.
#[allow(clippy::too_many_arguments)]
pub fn pick_hex(
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_q: Query<(&Camera, &GlobalTransform), With<BattleCamera>>,
    mode: Res<ViewMode>,
    config: Res<BattlefieldConfig>,
    mut battlefield: ResMut<ActiveBattlefield>,
    mut campaign: ResMut<ActiveCampaign>,
    mut hits: ResMut<PendingHits>,
) {
    let left = mouse.just_pressed(MouseButton::Left);
    let right = mouse.just_pressed(MouseButton::Right);
    if !left && !right {
        return;
    }
    let Ok(window) = windows.single() else { return };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(cam_gt, cursor) else {
        return;
    };
    let Some(distance) = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y)) else {
        return;
    };
    let point = to_scene(ray.get_point(distance));

    if *mode == ViewMode::Campaign {
        if left && let Some(key) = campaign.0.handle_click(point) {
            campaign.0.highlight_hex(key);
        }
        return;
    }

    let bf = &mut battlefield.0;
    let Some(target) = bf.handle_click(point) else {
        return;
    };
    if left {
        bf.apply_hex_selection(&[target]);
        return;
    }
    let Some(&from) = bf.selection().selected.iter().next() else {
        debug!(hex = %target, "nothing selected");
        return;
    };
    if from == target {
        return;
    }

    let shift = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
    if shift {
        let Some(unit) = bf.registry().get(from).and_then(|c| c.unit.clone()) else {
            return;
        };
        bf.clear_unit(from);
        bf.render_unit(target, &unit.snapshot, unit.faction, unit.spotted_only);
        bf.animate_unit_move(from, target, config.animation.default_move_ms);
        bf.apply_hex_selection(&[target]);
        return;
    }

    let defender = bf.registry().get(target).and_then(|c| c.unit.as_ref()).map(|u| u.class());
    let hard = defender.is_some_and(|class| class.is_hard());
    let join = bf.play_attack_sequence(from, target, hard);
    if defender.is_some() {
        hits.0.push(PendingHit {
            join,
            target,
            damage: HIT_DAMAGE,
        });
    }
}

/// N advances the aftermath turn, I toggles idle highlights, C switches view
/// (dropping any move still in flight), R clears all aftermath.
pub fn battle_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut mode: ResMut<ViewMode>,
    mut battlefield: ResMut<ActiveBattlefield>,
    campaign: Res<ActiveCampaign>,
    mut camera_q: Query<&mut Transform, With<BattleCamera>>,
) {
    if keys.just_pressed(KeyCode::KeyN) {
        battlefield.0.advance_aftermath_turn();
        info!("aftermath turn advanced");
    }
    if keys.just_pressed(KeyCode::KeyR) {
        battlefield.0.reset_aftermath();
        info!("aftermath cleared");
    }
    if keys.just_pressed(KeyCode::KeyI) {
        let idle: Vec<_> = battlefield
            .0
            .registry()
            .cells()
            .filter(|c| c.unit.as_ref().is_some_and(|u| u.faction == Faction::Player))
            .map(|c| c.key)
            .collect();
        battlefield.0.toggle_idle_unit_highlight(&idle);
    }
    if keys.just_pressed(KeyCode::KeyC) {
        battlefield.0.dispose_all_moves();
        *mode = match *mode {
            ViewMode::Tactical => ViewMode::Campaign,
            ViewMode::Campaign => ViewMode::Tactical,
        };
        let focus = focus_point(active_scene(*mode, &battlefield, &campaign));
        if let Ok(mut transform) = camera_q.single_mut() {
            *transform = look_down_at(focus, transform.translation.y);
        }
    }
}

// ── Debugging ──────────────────────────────────────────────────────

/// Draws hex and marker labels as screen-projected egui text.
pub fn draw_hex_labels(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    camera_q: Query<(&Camera, &GlobalTransform), With<BattleCamera>>,
    mode: Res<ViewMode>,
    battlefield: Res<ActiveBattlefield>,
    campaign: Res<ActiveCampaign>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let painter = ctx.get_mut().layer_painter(egui::LayerId::background());

    for item in flatten(active_scene(*mode, &battlefield, &campaign)) {
        let Shape::Label(text) = &item.shape else {
            continue;
        };
        if let Ok(viewport) = camera.world_to_viewport(cam_gt, to_world(item.origin)) {
            painter.text(
                egui::pos2(viewport.x, viewport.y),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(11.0),
                egui::Color32::WHITE,
            );
        }
    }
}
