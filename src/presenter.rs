//! Presenter: draws the retained battlefield (or campaign) scene with gizmos
//! under a bloom camera, drives the animation clock from frame time and turns
//! mouse clicks into hex clicks.
//!
//! Scene pixels map onto the world XZ plane, scene `y` growing toward world
//! `+z`, scaled by [`WORLD_SCALE`].

mod entities;
mod systems;

pub use entities::{
    ActiveBattlefield, ActiveCampaign, BattleCamera, DrawItem, HitOutcome, PendingHit,
    PendingHits, ViewMode, apply_hit, flatten, resolve_finished_hits, stroke_color,
};

use bevy::prelude::*;

use crate::GameState;
use crate::battlefield::BattlefieldConfig;

/// World units per scene pixel.
pub const WORLD_SCALE: f32 = 0.05;

/// Scene point to the world ground plane.
pub fn to_world(point: Vec2) -> Vec3 {
    Vec3::new(point.x * WORLD_SCALE, 0.0, point.y * WORLD_SCALE)
}

/// World position to scene space (height is dropped).
pub fn to_scene(world: Vec3) -> Vec2 {
    Vec2::new(world.x, world.z) / WORLD_SCALE
}

/// Battlefield plugin: scheduler clock, gizmo drawing, picking and demo keys.
pub struct BattlefieldPlugin(pub BattlefieldConfig);

impl Plugin for BattlefieldPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<BattlefieldConfig>()
            .register_type::<BattleCamera>()
            .register_type::<ViewMode>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(Color::srgb(0.01, 0.01, 0.02)))
            .init_resource::<ActiveBattlefield>()
            .init_resource::<ActiveCampaign>()
            .init_resource::<ViewMode>()
            .init_resource::<PendingHits>()
            .add_systems(PostStartup, systems::setup_camera)
            .add_systems(
                Update,
                (
                    systems::tick_battlefield,
                    systems::resolve_hits,
                    systems::draw_scene,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    systems::pan_camera,
                    systems::pick_hex,
                    systems::battle_keys,
                )
                    .run_if(in_state(GameState::Running)),
            );

        app.add_systems(
            Update,
            systems::draw_hex_labels.run_if(in_state(GameState::Debugging)),
        );
    }
}
