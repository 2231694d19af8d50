//! Attack sequence composition.
//!
//! Each archetype has its own delivery stage (tracers, a shell, a gun run or a
//! bomb drop); everything that happens on the target hangs off the delivery
//! task, and the whole sequence is wrapped in one join.

use bevy::prelude::*;

use super::effects::{Anchor, Burst, NodeRef, Projectile, Recoil, Shake, Sparks, TagPulse, Tracer};
use super::profile::{AttackArchetype, CombatVisualProfile, ExplosionStyle};
use super::scheduler::{Effect, Scheduler, TaskId};
use crate::battlefield::AnimationSettings;
use crate::coords::HexKey;
use crate::math::XorShift32;
use crate::scene::NodeId;

/// Visual-state tag for the brief brightness flash on a hex polygon.
pub const FLASH_TAG: &str = "flash";
/// Visual-state tag on the target marker ring.
pub const MARKER_TAG: &str = "target-marker";
/// Visual-state tag on lingering dust clouds.
pub const DUST_TAG: &str = "dust";

const MUZZLE_COLOR: Color = Color::srgb(1.0, 0.9, 0.5);
const IMPACT_COLOR: Color = Color::srgb(1.0, 0.55, 0.15);
const SPARK_COLOR: Color = Color::srgb(1.0, 0.85, 0.4);
const DUST_COLOR: Color = Color::srgb(0.55, 0.48, 0.38);
const MARKER_COLOR: Color = Color::srgb(1.0, 0.2, 0.2);
const SHELL_COLOR: Color = Color::srgb(0.25, 0.25, 0.25);

/// Everything the composer needs to know about the two hexes, looked up from
/// the registry when the attack is requested.
#[derive(Debug, Clone, Copy)]
pub struct Engagement {
    /// Attacking hex.
    pub attacker: HexKey,
    /// Defending hex.
    pub defender: HexKey,
    /// Attacker center.
    pub from: Anchor,
    /// Defender center.
    pub to: Anchor,
    /// Attacker unit stack.
    pub attacker_stack: NodeRef,
    /// Attacker hex polygon.
    pub attacker_polygon: NodeRef,
    /// Defender unit stack.
    pub defender_stack: NodeRef,
    /// Defender hex polygon.
    pub defender_polygon: NodeRef,
    /// Parent for temporary effect nodes.
    pub layer: Option<NodeId>,
    /// Hex radius in pixels.
    pub hex_radius: f32,
}

impl Engagement {
    fn direction(&self) -> Vec2 {
        match (self.from.point, self.to.point) {
            (Some(from), Some(to)) => (to - from).normalize_or_zero(),
            _ => Vec2::X,
        }
    }

    fn seed(&self) -> u32 {
        self.defender.seed() ^ self.attacker.seed().rotate_left(16)
    }
}

/// Schedules the whole attack and returns a join that finishes after every
/// sub-effect.
pub fn compose_attack(
    scheduler: &mut Scheduler,
    engagement: &Engagement,
    profile: &CombatVisualProfile,
    settings: &AnimationSettings,
) -> TaskId {
    let mut tasks = Vec::new();

    // Firing side.
    let r = engagement.hex_radius;
    if profile.archetype != AttackArchetype::AirBombing {
        tasks.push(
            scheduler.spawn(
                Burst::new(
                    "muzzle-flash",
                    engagement.layer,
                    engagement.from,
                    MUZZLE_COLOR,
                    settings.muzzle_flash_ms,
                )
                .radius(r * 0.1, r * 0.3)
                .offset(engagement.direction() * r * 0.35)
                .boxed(),
            ),
        );
    }
    tasks.push(scheduler.spawn(
        TagPulse::new(
            "fire-flash",
            engagement.attacker_polygon,
            FLASH_TAG,
            settings.flash_ms,
        )
        .boxed(),
    ));
    if profile.recoil > 0.0 {
        tasks.push(scheduler.spawn(
            Recoil::new(
                engagement.attacker_stack,
                engagement.direction(),
                profile.recoil,
                settings.recoil_ms,
            )
            .boxed(),
        ));
    }
    tasks.push(
        scheduler.spawn(
            Burst::new(
                "target-marker",
                engagement.layer,
                engagement.to,
                MARKER_COLOR,
                settings.marker_ms,
            )
            .radius(r * 0.9, r * 0.75)
            .opacity(0.9, 0.0)
            .tag(MARKER_TAG)
            .boxed(),
        ),
    );

    let delivery = deliver(scheduler, engagement, profile, settings);
    tasks.push(delivery);
    land(scheduler, delivery, engagement, profile, settings, &mut tasks);

    scheduler.all("attack", tasks)
}

fn deliver(
    scheduler: &mut Scheduler,
    engagement: &Engagement,
    profile: &CombatVisualProfile,
    settings: &AnimationSettings,
) -> TaskId {
    let r = engagement.hex_radius;
    let across = engagement.direction().perp();
    match profile.archetype {
        AttackArchetype::SmallArms | AttackArchetype::AirStrafe => {
            let count = profile.tracer_count.max(1);
            let spread = if profile.archetype == AttackArchetype::AirStrafe {
                r * 0.45
            } else {
                r * 0.15
            };
            let tracers: Vec<Box<dyn Effect>> = (0..count)
                .map(|i| {
                    let lane = if count == 1 {
                        0.0
                    } else {
                        i as f32 / (count - 1) as f32 - 0.5
                    };
                    Tracer::new(
                        engagement.layer,
                        engagement.from,
                        engagement.to,
                        profile.tracer_color,
                        profile.tracer_width,
                        settings.tracer_ms,
                    )
                    .offset(across * lane * spread)
                    .boxed()
                })
                .collect();
            scheduler.stagger("tracers", settings.tracer_stagger_ms, tracers)
        }
        AttackArchetype::ArcingArtillery => scheduler.spawn(
            Projectile::new(
                "shell",
                engagement.layer,
                engagement.from,
                engagement.to,
                settings.arc_height,
                r * 0.08,
                SHELL_COLOR,
                settings.projectile_ms,
            )
            .boxed(),
        ),
        AttackArchetype::AirBombing => {
            let bombs: Vec<Box<dyn Effect>> = (0..profile.impact_count)
                .map(|_| {
                    Projectile::new(
                        "bomb",
                        engagement.layer,
                        engagement.from,
                        engagement.to,
                        settings.arc_height * 0.3,
                        r * 0.07,
                        SHELL_COLOR,
                        settings.bomb_drop_ms,
                    )
                    .boxed()
                })
                .collect();
            scheduler.stagger("bombs", settings.impact_stagger_ms, bombs)
        }
    }
}

fn land(
    scheduler: &mut Scheduler,
    delivery: TaskId,
    engagement: &Engagement,
    profile: &CombatVisualProfile,
    settings: &AnimationSettings,
    tasks: &mut Vec<TaskId>,
) {
    let r = engagement.hex_radius;
    let mut rng = XorShift32::new(engagement.seed());
    let radius = r * profile.explosion_radius;
    let (opacity, style_radius) = match profile.explosion {
        ExplosionStyle::Ground => (1.0, radius),
        ExplosionStyle::AirBurst => (0.8, radius * 0.8),
    };

    let impacts: Vec<Box<dyn Effect>> = (0..profile.impact_count)
        .map(|i| {
            let offset = if i == 0 {
                Vec2::ZERO
            } else {
                Vec2::new(rng.range(-0.25, 0.25), rng.range(-0.25, 0.25)) * r
            };
            Burst::new(
                "impact",
                engagement.layer,
                engagement.to,
                IMPACT_COLOR,
                settings.impact_ms,
            )
            .radius(style_radius * 0.3, style_radius)
            .opacity(opacity, 0.0)
            .offset(offset)
            .boxed()
        })
        .collect();
    let impacts = scheduler.stagger_after("impacts", delivery, settings.impact_stagger_ms, impacts);
    tasks.push(impacts);

    tasks.push(scheduler.after(
        delivery,
        0.0,
        TagPulse::new(
            "impact-flash",
            engagement.defender_polygon,
            FLASH_TAG,
            settings.flash_ms,
        )
        .boxed(),
    ));
    tasks.push(scheduler.after(
        delivery,
        0.0,
        Shake::new(
            engagement.defender_stack,
            settings.shake_amplitude,
            settings.shake_ms,
        )
        .boxed(),
    ));

    if profile.spark_count > 0 {
        tasks.push(scheduler.after(
            delivery,
            0.0,
            Sparks::new(
                engagement.layer,
                engagement.to,
                profile.spark_count,
                engagement.seed(),
                SPARK_COLOR,
                r * 0.6,
                settings.sparks_ms,
            )
            .boxed(),
        ));
    }

    if profile.dust {
        tasks.push(
            scheduler.after(
                impacts,
                0.0,
                Burst::new(
                    "dust",
                    engagement.layer,
                    engagement.to,
                    DUST_COLOR,
                    settings.dust_ms,
                )
                .radius(r * 0.3, r * 0.7)
                .opacity(0.6, 0.0)
                .tag(DUST_TAG)
                .boxed(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::TaskState;
    use crate::catalog::{UnitClass, UnitTypeInfo};
    use crate::scene::{NodeRole, NodeSpec, RetainedScene, SceneGraph, Shape};

    fn engagement(scene: &mut RetainedScene) -> Engagement {
        let attacker = HexKey::new(0, 0);
        let defender = HexKey::new(3, 0);
        let stack = |scene: &mut RetainedScene, key| {
            scene.create(None, NodeSpec::new(NodeRole::UnitStack, Shape::Group).hex(key))
        };
        let a_stack = stack(scene, attacker);
        let d_stack = stack(scene, defender);
        Engagement {
            attacker,
            defender,
            from: Anchor::new(attacker, Some(Vec2::ZERO)),
            to: Anchor::new(defender, Some(Vec2::new(90.0, 0.0))),
            attacker_stack: NodeRef::new(attacker, Some(a_stack)),
            attacker_polygon: NodeRef::new(attacker, None),
            defender_stack: NodeRef::new(defender, Some(d_stack)),
            defender_polygon: NodeRef::new(defender, None),
            layer: None,
            hex_radius: 20.0,
        }
    }

    fn run(scheduler: &mut Scheduler, scene: &mut RetainedScene, join: TaskId) {
        for _ in 0..1000 {
            if scheduler.is_finished(join) {
                return;
            }
            scheduler.tick(16.0, scene);
        }
        panic!("attack never finished");
    }

    fn check_join_is_last(attacker: UnitTypeInfo, hard: bool) {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let engagement = engagement(&mut scene);
        let profile = CombatVisualProfile::derive(&attacker, UnitClass::Infantry, hard);
        let join = compose_attack(&mut scheduler, &engagement, &profile, &AnimationSettings::default());
        assert_eq!(scheduler.status(join), Some(TaskState::Pending));

        run(&mut scheduler, &mut scene, join);

        let log: Vec<_> = scheduler.completion_log().collect();
        let last = log.last().unwrap();
        assert_eq!(last.task, join);
        assert!(log.len() > 5, "expected many sub-effects, got {}", log.len());
        assert_eq!(scene.count_role(NodeRole::Effect), 0);
    }

    // ── join ordering ──

    #[test]
    fn small_arms_join_completes_last() {
        check_join_is_last(UnitTypeInfo::of_class(UnitClass::Infantry), false);
    }

    #[test]
    fn artillery_join_completes_last() {
        check_join_is_last(UnitTypeInfo::of_class(UnitClass::Artillery), true);
    }

    #[test]
    fn strafe_join_completes_last() {
        check_join_is_last(UnitTypeInfo::of_class(UnitClass::Air), true);
    }

    #[test]
    fn bombing_join_completes_last() {
        let bomber = UnitTypeInfo {
            bomber: true,
            ..UnitTypeInfo::of_class(UnitClass::Air)
        };
        check_join_is_last(bomber, false);
    }

    // ── partial failure ──

    #[test]
    fn missing_defender_still_completes() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut engagement = engagement(&mut scene);
        engagement.to.point = None;
        engagement.defender_stack.node = None;
        let profile = CombatVisualProfile::derive(
            &UnitTypeInfo::of_class(UnitClass::Tank),
            UnitClass::Tank,
            true,
        );
        let join = compose_attack(&mut scheduler, &engagement, &profile, &AnimationSettings::default());
        run(&mut scheduler, &mut scene, join);
        let last = scheduler.completion_log().last().unwrap();
        assert_eq!((last.task, last.state), (join, TaskState::Done));
        assert_eq!(scene.count_role(NodeRole::Effect), 0);
    }

    #[test]
    fn impacts_follow_delivery() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let engagement = engagement(&mut scene);
        let profile = CombatVisualProfile::derive(
            &UnitTypeInfo::of_class(UnitClass::Artillery),
            UnitClass::Infantry,
            false,
        );
        let join = compose_attack(&mut scheduler, &engagement, &profile, &AnimationSettings::default());
        run(&mut scheduler, &mut scene, join);

        let at = |label: &str| {
            scheduler
                .completion_log()
                .filter(|c| c.label == label)
                .map(|c| c.at_ms)
                .collect::<Vec<_>>()
        };
        let shell = at("shell")[0];
        assert!(at("impact").iter().all(|&t| t > shell));
        assert!(at("dust").iter().all(|&t| t > shell));
        assert!(scene.node(engagement.defender_stack.node.unwrap()).is_some());
    }
}
