//! Per-engagement visual parameters derived from the units involved.

use bevy::prelude::*;

use crate::catalog::{UnitClass, UnitTypeInfo};

/// How the attacker delivers fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum AttackArchetype {
    /// Direct fire: staggered tracers.
    SmallArms,
    /// Indirect fire: one shell on a Bézier arc.
    ArcingArtillery,
    /// Aircraft gun run.
    AirStrafe,
    /// Aircraft dropping ordnance.
    AirBombing,
}

impl AttackArchetype {
    /// Archetype for an attacker.
    pub fn select(attacker: &UnitTypeInfo) -> Self {
        match attacker.class {
            UnitClass::Air if attacker.bomber => Self::AirBombing,
            UnitClass::Air => Self::AirStrafe,
            UnitClass::Artillery => Self::ArcingArtillery,
            _ => Self::SmallArms,
        }
    }

    /// Whether the round travels on an arc instead of as tracers.
    pub fn is_ballistic(self) -> bool {
        matches!(self, Self::ArcingArtillery | Self::AirBombing)
    }
}

/// Shape of the impact explosion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum ExplosionStyle {
    /// Ground blast with debris.
    Ground,
    /// Small flak-style burst for airborne defenders.
    AirBurst,
}

/// Round type, used to pick the tracer palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum Ordnance {
    /// Rifle and machine-gun rounds.
    Kinetic,
    /// Cannon, shells and bombs.
    Explosive,
    /// Aircraft cannon.
    Aerial,
}

/// Tracer color per ordnance.
pub fn ordnance_color(ordnance: Ordnance) -> Color {
    match ordnance {
        Ordnance::Kinetic => Color::srgb(1.0, 0.8, 0.0),
        Ordnance::Explosive => Color::srgb(1.0, 0.4, 0.2),
        Ordnance::Aerial => Color::srgb(1.0, 0.95, 0.6),
    }
}

/// Stateless description of how one attack looks.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct CombatVisualProfile {
    /// Delivery archetype.
    pub archetype: AttackArchetype,
    /// Round type.
    pub ordnance: Ordnance,
    /// Tracer color.
    pub tracer_color: Color,
    /// Tracer stroke width in pixels.
    pub tracer_width: f32,
    /// Number of tracers (zero for ballistic archetypes).
    pub tracer_count: u32,
    /// Impact bursts, 1–3.
    pub impact_count: u32,
    /// Attacker recoil in pixels.
    pub recoil: f32,
    /// Spark rays; zero unless the target is hard.
    pub spark_count: u32,
    /// Explosion radius as a fraction of the hex radius.
    pub explosion_radius: f32,
    /// Explosion style.
    pub explosion: ExplosionStyle,
    /// Lingering dust on soft ground targets.
    pub dust: bool,
}

impl CombatVisualProfile {
    /// Derives the profile for `attacker` firing on a `defender` class.
    pub fn derive(attacker: &UnitTypeInfo, defender: UnitClass, hard_target: bool) -> Self {
        let archetype = AttackArchetype::select(attacker);
        let airborne_defender = defender.is_airborne();

        let ordnance = match (archetype, attacker.class) {
            (AttackArchetype::AirStrafe, _) => Ordnance::Aerial,
            (AttackArchetype::ArcingArtillery | AttackArchetype::AirBombing, _) => {
                Ordnance::Explosive
            }
            (_, UnitClass::Tank | UnitClass::Naval) => Ordnance::Explosive,
            _ => Ordnance::Kinetic,
        };

        let tracer_count = match archetype {
            AttackArchetype::AirStrafe => 5,
            AttackArchetype::ArcingArtillery | AttackArchetype::AirBombing => 0,
            AttackArchetype::SmallArms => match attacker.class {
                UnitClass::Tank | UnitClass::Naval => 1,
                UnitClass::Vehicle => 4,
                UnitClass::Specialist => 2,
                _ => 3,
            },
        };
        let tracer_width = match attacker.class {
            UnitClass::Tank | UnitClass::Naval => 3.0,
            UnitClass::Vehicle => 2.0,
            _ => 1.5,
        };

        let recoil = match attacker.class {
            UnitClass::Artillery => 8.0,
            UnitClass::Tank => 6.0,
            UnitClass::Naval => 5.0,
            UnitClass::Vehicle => 3.0,
            UnitClass::Air => 0.0,
            _ => 1.5,
        };

        let mut impact_count = match archetype {
            AttackArchetype::ArcingArtillery | AttackArchetype::AirBombing => 3,
            AttackArchetype::AirStrafe => 2,
            AttackArchetype::SmallArms if ordnance == Ordnance::Explosive => 2,
            AttackArchetype::SmallArms => 1,
        };

        let mut spark_count = if hard_target {
            match attacker.class {
                UnitClass::Artillery | UnitClass::Naval => 14,
                UnitClass::Tank => 12,
                UnitClass::Air => 10,
                UnitClass::Vehicle => 8,
                _ => 6,
            }
        } else {
            0
        };

        let (explosion, mut explosion_radius) = if archetype.is_ballistic() {
            (ExplosionStyle::Ground, 0.7)
        } else {
            (ExplosionStyle::Ground, 0.45)
        };

        if airborne_defender {
            impact_count = 1;
            explosion_radius = 0.3;
            if hard_target {
                spark_count = 6;
            }
        }

        Self {
            archetype,
            ordnance,
            tracer_color: ordnance_color(ordnance),
            tracer_width,
            tracer_count,
            impact_count,
            recoil,
            spark_count,
            explosion_radius,
            explosion: if airborne_defender {
                ExplosionStyle::AirBurst
            } else {
                explosion
            },
            dust: !hard_target && !airborne_defender,
        }
    }
}
