//! Battlefield: the facade the battle screen talks to, plus the nested
//! configuration every subsystem reads from.

mod engine;
mod selection;

pub use engine::Battlefield;
pub use selection::{IDLE_TAG, SELECTED_TAG, SelectionState, ZoneKind};

use bevy::prelude::*;

/// Nested configuration for the battlefield and campaign renderers.
#[derive(Resource, Clone, Debug, Default, Reflect)]
pub struct BattlefieldConfig {
    /// Hex grid drawing.
    pub grid: GridSettings,
    /// Unit stacks.
    pub units: UnitSettings,
    /// Effect timings and shapes.
    pub animation: AnimationSettings,
    /// Smoke, flame and wreck overlays.
    pub aftermath: AftermathSettings,
    /// Strategic map.
    pub campaign: CampaignSettings,
}

/// Hex grid drawing.
#[derive(Clone, Debug, Reflect)]
pub struct GridSettings {
    /// Hex circumradius in pixels.
    pub hex_radius: f32,
    /// Outline color of hex polygons.
    pub outline_color: Color,
    /// Color of coordinate labels.
    pub label_color: Color,
    /// Whether hexes carry a coordinate label node.
    pub show_labels: bool,
    /// Outline color of selected hexes.
    pub selection_color: Color,
}

/// Unit stack drawing.
#[derive(Clone, Debug, Reflect)]
pub struct UnitSettings {
    /// Icon size as a fraction of the hex radius.
    pub icon_size: f32,
    /// Transport vessel width as a fraction of the hex radius.
    pub boat_width: f32,
    /// Transport vessel color.
    pub boat_color: Color,
    /// Opacity of units known only from recon.
    pub spotted_opacity: f32,
}

/// Effect timings (milliseconds) and shapes.
#[derive(Clone, Debug, Reflect)]
pub struct AnimationSettings {
    /// Bézier control-point offset as a fraction of the shot distance.
    pub arc_height: f32,
    /// Muzzle flash.
    pub muzzle_flash_ms: f32,
    /// Localized brightness flash on a hex.
    pub flash_ms: f32,
    /// One tracer's flight.
    pub tracer_ms: f32,
    /// Gap between staggered tracers.
    pub tracer_stagger_ms: f32,
    /// Artillery shell flight.
    pub projectile_ms: f32,
    /// Bomb fall.
    pub bomb_drop_ms: f32,
    /// One impact burst.
    pub impact_ms: f32,
    /// Gap between staggered impacts and bombs.
    pub impact_stagger_ms: f32,
    /// Defender hit shake.
    pub shake_ms: f32,
    /// Peak hit shake offset in pixels.
    pub shake_amplitude: f32,
    /// Attacker recoil.
    pub recoil_ms: f32,
    /// Spark rays.
    pub sparks_ms: f32,
    /// Lingering dust.
    pub dust_ms: f32,
    /// Target marker.
    pub marker_ms: f32,
    /// Duration used by callers that do not pick one for moves.
    pub default_move_ms: f32,
}

/// Aftermath overlay drawing and default turn counts.
#[derive(Clone, Debug, Reflect)]
pub struct AftermathSettings {
    /// Smoke puff color.
    pub smoke_color: Color,
    /// Opacity of the lowest smoke puff.
    pub smoke_opacity: f32,
    /// Flame blade color.
    pub flame_color: Color,
    /// Wreck silhouette color.
    pub wreck_color: Color,
    /// Default burn turns for destroyed vehicles.
    pub fire_turns: u32,
    /// Default smoke turns for damaged vehicles.
    pub damage_turns: u32,
}

/// Strategic map drawing.
#[derive(Clone, Debug, Reflect)]
pub struct CampaignSettings {
    /// Unscaled hex radius; the projector scales it to fit the canvas.
    pub hex_radius: f32,
    /// Canvas size in pixels.
    pub canvas: Vec2,
    /// Fill of official hexes.
    pub land_color: Color,
    /// Fill of padding hexes.
    pub out_of_bounds_color: Color,
    /// Outline of the highlighted hex.
    pub highlight_color: Color,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            hex_radius: 32.0,
            outline_color: Color::srgb(0.08, 0.08, 0.06),
            label_color: Color::srgba(1.0, 1.0, 1.0, 0.6),
            show_labels: true,
            selection_color: Color::srgb(1.0, 0.95, 0.3),
        }
    }
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            icon_size: 0.9,
            boat_width: 1.1,
            boat_color: Color::srgb(0.30, 0.26, 0.20),
            spotted_opacity: 0.45,
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            arc_height: 0.32,
            muzzle_flash_ms: 120.0,
            flash_ms: 150.0,
            tracer_ms: 220.0,
            tracer_stagger_ms: 60.0,
            projectile_ms: 650.0,
            bomb_drop_ms: 450.0,
            impact_ms: 320.0,
            impact_stagger_ms: 90.0,
            shake_ms: 300.0,
            shake_amplitude: 4.0,
            recoil_ms: 220.0,
            sparks_ms: 380.0,
            dust_ms: 900.0,
            marker_ms: 500.0,
            default_move_ms: 450.0,
        }
    }
}

impl Default for AftermathSettings {
    fn default() -> Self {
        Self {
            smoke_color: Color::srgb(0.22, 0.22, 0.22),
            smoke_opacity: 0.6,
            flame_color: Color::srgb(1.0, 0.45, 0.1),
            wreck_color: Color::srgb(0.12, 0.11, 0.10),
            fire_turns: 3,
            damage_turns: 2,
        }
    }
}

impl Default for CampaignSettings {
    fn default() -> Self {
        Self {
            hex_radius: 30.0,
            canvas: Vec2::new(1024.0, 768.0),
            land_color: Color::srgb(0.36, 0.42, 0.28),
            out_of_bounds_color: Color::srgb(0.16, 0.18, 0.20),
            highlight_color: Color::srgb(1.0, 0.85, 0.2),
        }
    }
}
