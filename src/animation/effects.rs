use bevy::prelude::*;

use super::scheduler::Effect;
use crate::coords::HexKey;
use crate::error::{RenderError, Result};
use crate::math::{self, XorShift32};
use crate::scene::{NodeId, NodeRole, NodeSpec, Placement, SceneGraph, Shape};

/// A pixel position resolved from the registry at composition time.
///
/// `point` is `None` when the hex had no cell; effects anchored there abort
/// on start instead of failing the whole sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Hex the position belongs to (for diagnostics).
    pub key: HexKey,
    /// Absolute pixel position.
    pub point: Option<Vec2>,
}

impl Anchor {
    /// Anchor at a known point.
    pub fn new(key: HexKey, point: Option<Vec2>) -> Self {
        Self { key, point }
    }

    /// The point, or a missing-node error.
    pub fn resolve(&self, what: &'static str) -> Result<Vec2> {
        self.point.ok_or(RenderError::missing(what, self.key))
    }
}

/// A scene node looked up from the registry at composition time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRef {
    /// Hex the node belongs to.
    pub key: HexKey,
    /// The node, if the hex had one.
    pub node: Option<NodeId>,
}

impl NodeRef {
    /// Reference to an optional node.
    pub fn new(key: HexKey, node: Option<NodeId>) -> Self {
        Self { key, node }
    }

    fn resolve(&self, scene: &dyn SceneGraph, what: &'static str) -> Result<NodeId> {
        let id = self.node.ok_or(RenderError::missing(what, self.key))?;
        if !scene.contains(id) {
            return Err(RenderError::DeadNode(id.0));
        }
        Ok(id)
    }
}

fn progress(elapsed_ms: f32, duration_ms: f32) -> f32 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    math::clamp_progress(elapsed_ms / duration_ms)
}

fn alive(scene: &dyn SceneGraph, id: Option<NodeId>) -> Result<NodeId> {
    match id {
        Some(id) if scene.contains(id) => Ok(id),
        Some(id) => Err(RenderError::DeadNode(id.0)),
        None => Err(RenderError::DeadNode(u64::MAX)),
    }
}

// ── Burst ──────────────────────────────────────────────────────────

/// Expanding, fading circle: muzzle flashes, impacts, dust, target markers.
pub struct Burst {
    label: &'static str,
    layer: Option<NodeId>,
    at: Anchor,
    offset: Vec2,
    color: Color,
    duration: f32,
    radius: (f32, f32),
    opacity: (f32, f32),
    tag: Option<&'static str>,
    node: Option<NodeId>,
}

impl Burst {
    /// Burst at `at` that fades out over `duration_ms`.
    pub fn new(
        label: &'static str,
        layer: Option<NodeId>,
        at: Anchor,
        color: Color,
        duration_ms: f32,
    ) -> Self {
        Self {
            label,
            layer,
            at,
            offset: Vec2::ZERO,
            color,
            duration: duration_ms,
            radius: (4.0, 12.0),
            opacity: (1.0, 0.0),
            tag: None,
            node: None,
        }
    }

    /// Start and end radius.
    pub fn radius(mut self, from: f32, to: f32) -> Self {
        self.radius = (from, to);
        self
    }

    /// Start and end opacity.
    pub fn opacity(mut self, from: f32, to: f32) -> Self {
        self.opacity = (from, to);
        self
    }

    /// Pixel offset from the anchor.
    pub fn offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Visual-state tag on the burst node (`target-marker`, `dust`, ...).
    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for Burst {
    fn label(&self) -> &'static str {
        self.label
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let at = self.at.resolve("burst anchor")? + self.offset;
        let node = scene.create(
            self.layer,
            NodeSpec::new(
                NodeRole::Effect,
                Shape::Circle {
                    radius: self.radius.0,
                },
            )
            .hex(self.at.key)
            .at(at)
            .color(self.color)
            .opacity(self.opacity.0),
        );
        if let Some(tag) = self.tag {
            scene.set_tag(node, tag, true);
        }
        self.node = Some(node);
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let node = alive(scene, self.node)?;
        let t = progress(elapsed_ms, self.duration);
        let e = math::ease_out_cubic(t);
        let radius = self.radius.0 + (self.radius.1 - self.radius.0) * e;
        scene.set_shape(node, Shape::Circle { radius });
        scene.set_opacity(node, self.opacity.0 + (self.opacity.1 - self.opacity.0) * t);
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(node) = self.node.take() {
            scene.remove(node);
        }
    }
}

// ── Tracer ─────────────────────────────────────────────────────────

/// A short streak whose head travels from attacker to defender.
pub struct Tracer {
    layer: Option<NodeId>,
    from: Anchor,
    to: Anchor,
    offset: Vec2,
    color: Color,
    width: f32,
    streak: f32,
    duration: f32,
    path: Option<(Vec2, Vec2)>,
    node: Option<NodeId>,
}

impl Tracer {
    /// Tracer between two anchors; `streak` is the visible fraction of the path.
    pub fn new(
        layer: Option<NodeId>,
        from: Anchor,
        to: Anchor,
        color: Color,
        width: f32,
        duration_ms: f32,
    ) -> Self {
        Self {
            layer,
            from,
            to,
            offset: Vec2::ZERO,
            color,
            width,
            streak: 0.25,
            duration: duration_ms,
            path: None,
            node: None,
        }
    }

    /// Shifts both ends (spreads a burst of tracers).
    pub fn offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for Tracer {
    fn label(&self) -> &'static str {
        "tracer"
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let from = self.from.resolve("tracer origin")? + self.offset;
        let to = self.to.resolve("tracer target")? + self.offset;
        self.path = Some((from, to));
        self.node = Some(scene.create(
            self.layer,
            NodeSpec::new(
                NodeRole::Effect,
                Shape::Line {
                    to: Vec2::ZERO,
                    width: self.width,
                },
            )
            .at(from)
            .color(self.color),
        ));
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let node = alive(scene, self.node)?;
        let Some((from, to)) = self.path else {
            return Ok(true);
        };
        let t = progress(elapsed_ms, self.duration);
        let head = from.lerp(to, t);
        let tail = from.lerp(to, (t - self.streak).max(0.0));
        scene.set_placement(node, Placement::at(tail));
        scene.set_shape(
            node,
            Shape::Line {
                to: head - tail,
                width: self.width,
            },
        );
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(node) = self.node.take() {
            scene.remove(node);
        }
    }
}

// ── Projectile ─────────────────────────────────────────────────────

/// A shell or bomb travelling on a quadratic Bézier arc.
pub struct Projectile {
    label: &'static str,
    layer: Option<NodeId>,
    from: Anchor,
    to: Anchor,
    arc_height: f32,
    radius: f32,
    color: Color,
    duration: f32,
    path: Option<(Vec2, Vec2, Vec2)>,
    node: Option<NodeId>,
}

impl Projectile {
    /// Arced projectile; `arc_height` is the control-point offset as a
    /// fraction of the distance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        label: &'static str,
        layer: Option<NodeId>,
        from: Anchor,
        to: Anchor,
        arc_height: f32,
        radius: f32,
        color: Color,
        duration_ms: f32,
    ) -> Self {
        Self {
            label,
            layer,
            from,
            to,
            arc_height,
            radius,
            color,
            duration: duration_ms,
            path: None,
            node: None,
        }
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for Projectile {
    fn label(&self) -> &'static str {
        self.label
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let from = self.from.resolve("projectile origin")?;
        let to = self.to.resolve("projectile target")?;
        let control = math::arc_control_point(from, to, self.arc_height);
        self.path = Some((from, control, to));
        self.node = Some(scene.create(
            self.layer,
            NodeSpec::new(
                NodeRole::Effect,
                Shape::Circle {
                    radius: self.radius,
                },
            )
            .at(from)
            .color(self.color),
        ));
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let node = alive(scene, self.node)?;
        let Some((from, control, to)) = self.path else {
            return Ok(true);
        };
        let t = progress(elapsed_ms, self.duration);
        let eased = math::ease_in_out_cosine(t);
        scene.set_placement(
            node,
            Placement::at(math::quadratic_bezier(from, control, to, eased)),
        );
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(node) = self.node.take() {
            scene.remove(node);
        }
    }
}

// ── Shake / recoil ─────────────────────────────────────────────────

/// Node being jostled and the offset currently added to its translation.
///
/// Offsets are applied as deltas, so overlapping shakes and recoils on one
/// node compose and the node ends at its rest translation.
#[derive(Debug, Clone, Copy)]
struct Jostle {
    node: NodeId,
    applied: Vec2,
}

impl Jostle {
    fn start(scene: &dyn SceneGraph, node: NodeId) -> Result<Self> {
        scene.node(node).ok_or(RenderError::DeadNode(node.0))?;
        Ok(Self {
            node,
            applied: Vec2::ZERO,
        })
    }

    fn set_offset(&mut self, scene: &mut dyn SceneGraph, offset: Vec2) -> Result<()> {
        let mut placement = scene
            .node(self.node)
            .map(|n| n.placement)
            .ok_or(RenderError::DeadNode(self.node.0))?;
        placement.translation += offset - self.applied;
        scene.set_placement(self.node, placement);
        self.applied = offset;
        Ok(())
    }
}

/// Horizontal damped shake of an existing node (defender hit).
pub struct Shake {
    target: NodeRef,
    amplitude: f32,
    cycles: f32,
    duration: f32,
    jostle: Option<Jostle>,
}

impl Shake {
    /// Shakes `target` by up to `amplitude` pixels.
    pub fn new(target: NodeRef, amplitude: f32, duration_ms: f32) -> Self {
        Self {
            target,
            amplitude,
            cycles: 4.0,
            duration: duration_ms,
            jostle: None,
        }
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for Shake {
    fn label(&self) -> &'static str {
        "hit-shake"
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let node = self.target.resolve(scene, "shake target")?;
        self.jostle = Some(Jostle::start(scene, node)?);
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let Some(jostle) = self.jostle.as_mut() else {
            return Ok(true);
        };
        let t = progress(elapsed_ms, self.duration);
        let dx = math::damped_shake(t, self.amplitude, self.cycles);
        jostle.set_offset(scene, Vec2::new(dx, 0.0))?;
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(mut jostle) = self.jostle.take() {
            let _ = jostle.set_offset(scene, Vec2::ZERO);
        }
    }
}

/// Quick kick away from the target followed by a slower return.
pub struct Recoil {
    target: NodeRef,
    direction: Vec2,
    magnitude: f32,
    duration: f32,
    jostle: Option<Jostle>,
}

impl Recoil {
    /// Recoil of `target`; `toward` points at what it fired on.
    pub fn new(target: NodeRef, toward: Vec2, magnitude: f32, duration_ms: f32) -> Self {
        Self {
            target,
            direction: -toward.normalize_or_zero(),
            magnitude,
            duration: duration_ms,
            jostle: None,
        }
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for Recoil {
    fn label(&self) -> &'static str {
        "recoil"
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let node = self.target.resolve(scene, "recoil target")?;
        self.jostle = Some(Jostle::start(scene, node)?);
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let Some(jostle) = self.jostle.as_mut() else {
            return Ok(true);
        };
        let t = progress(elapsed_ms, self.duration);
        let kick = if t < 0.2 {
            math::ease_out_cubic(t / 0.2)
        } else {
            1.0 - math::ease_in_out_cosine((t - 0.2) / 0.8)
        };
        jostle.set_offset(scene, self.direction * self.magnitude * kick)?;
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(mut jostle) = self.jostle.take() {
            let _ = jostle.set_offset(scene, Vec2::ZERO);
        }
    }
}

// ── Sparks ─────────────────────────────────────────────────────────

/// Rays flying out of a hard-target impact.
pub struct Sparks {
    layer: Option<NodeId>,
    at: Anchor,
    count: u32,
    seed: u32,
    color: Color,
    length: f32,
    duration: f32,
    rays: Vec<(NodeId, Vec2)>,
}

impl Sparks {
    /// `count` rays up to `length` pixels long; directions come from `seed`.
    pub fn new(
        layer: Option<NodeId>,
        at: Anchor,
        count: u32,
        seed: u32,
        color: Color,
        length: f32,
        duration_ms: f32,
    ) -> Self {
        Self {
            layer,
            at,
            count,
            seed,
            color,
            length,
            duration: duration_ms,
            rays: Vec::new(),
        }
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for Sparks {
    fn label(&self) -> &'static str {
        "sparks"
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let at = self.at.resolve("spark origin")?;
        let mut rng = XorShift32::new(self.seed);
        let step = std::f32::consts::TAU / self.count.max(1) as f32;
        for i in 0..self.count {
            let angle = step * i as f32 + rng.range(-0.3, 0.3);
            let reach = self.length * rng.range(0.6, 1.0);
            let node = scene.create(
                self.layer,
                NodeSpec::new(
                    NodeRole::Effect,
                    Shape::Line {
                        to: Vec2::ZERO,
                        width: 1.2,
                    },
                )
                .at(at)
                .color(self.color),
            );
            self.rays.push((node, Vec2::from_angle(angle) * reach));
        }
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let t = progress(elapsed_ms, self.duration);
        let e = math::ease_out_cubic(t);
        for &(node, ray) in &self.rays {
            scene.set_shape(
                node,
                Shape::Line {
                    to: ray * e,
                    width: 1.2,
                },
            );
            scene.set_opacity(node, 1.0 - t);
        }
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        for (node, _) in self.rays.drain(..) {
            scene.remove(node);
        }
    }
}

// ── Tag pulse ──────────────────────────────────────────────────────

/// Holds a visual-state tag on a node for a while (localized brightness
/// flash on a hex polygon).
pub struct TagPulse {
    label: &'static str,
    target: NodeRef,
    tag: &'static str,
    duration: f32,
    node: Option<NodeId>,
}

impl TagPulse {
    /// Sets `tag` on `target` for `duration_ms`.
    pub fn new(label: &'static str, target: NodeRef, tag: &'static str, duration_ms: f32) -> Self {
        Self {
            label,
            target,
            tag,
            duration: duration_ms,
            node: None,
        }
    }

    /// Boxes the effect for the scheduler.
    pub fn boxed(self) -> Box<dyn Effect> {
        Box::new(self)
    }
}

impl Effect for TagPulse {
    fn label(&self) -> &'static str {
        self.label
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        let node = self.target.resolve(scene, "pulse target")?;
        scene.set_tag(node, self.tag, true);
        self.node = Some(node);
        Ok(())
    }

    fn update(&mut self, _scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        Ok(progress(elapsed_ms, self.duration) >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(node) = self.node.take() {
            scene.set_tag(node, self.tag, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Scheduler;
    use crate::scene::RetainedScene;

    fn anchor(x: f32, y: f32) -> Anchor {
        Anchor::new(HexKey::new(0, 0), Some(Vec2::new(x, y)))
    }

    #[test]
    fn burst_cleans_up_its_node() {
        let mut scene = RetainedScene::new();
        let mut sched = Scheduler::new();
        let id = sched.spawn(Burst::new("impact", None, anchor(0.0, 0.0), Color::WHITE, 100.0).boxed());
        sched.tick(10.0, &mut scene);
        assert_eq!(scene.count_role(NodeRole::Effect), 1);
        sched.tick(100.0, &mut scene);
        assert!(sched.is_finished(id));
        assert_eq!(scene.count_role(NodeRole::Effect), 0);
    }

    #[test]
    fn missing_anchor_aborts_without_nodes() {
        let mut scene = RetainedScene::new();
        let mut sched = Scheduler::new();
        let missing = Anchor::new(HexKey::new(9, 9), None);
        let id = sched.spawn(Tracer::new(None, anchor(0.0, 0.0), missing, Color::WHITE, 1.0, 50.0).boxed());
        sched.tick(16.0, &mut scene);
        assert!(sched.is_finished(id));
        assert!(scene.is_empty());
    }

    #[test]
    fn tracer_head_reaches_target() {
        let mut scene = RetainedScene::new();
        let mut tracer = Tracer::new(None, anchor(0.0, 0.0), anchor(100.0, 0.0), Color::WHITE, 1.0, 100.0);
        tracer.start(&mut scene).unwrap();
        assert!(tracer.update(&mut scene, 100.0).unwrap());
        let node = scene.node(tracer.node.unwrap()).unwrap();
        let Shape::Line { to, .. } = node.shape else {
            panic!("tracer should be a line");
        };
        assert!((node.placement.translation + to - Vec2::new(100.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn shake_restores_original_placement() {
        let mut scene = RetainedScene::new();
        let target = scene.create(None, NodeSpec::new(NodeRole::UnitStack, Shape::Group).at(Vec2::new(5.0, 5.0)));
        let mut shake = Shake::new(NodeRef::new(HexKey::new(0, 0), Some(target)), 4.0, 200.0);
        shake.start(&mut scene).unwrap();
        shake.update(&mut scene, 30.0).unwrap();
        assert_ne!(scene.node(target).unwrap().placement.translation, Vec2::new(5.0, 5.0));
        shake.finish(&mut scene);
        assert_eq!(scene.node(target).unwrap().placement.translation, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn recoil_kicks_away_from_target() {
        let mut scene = RetainedScene::new();
        let target = scene.create(None, NodeSpec::new(NodeRole::UnitStack, Shape::Group));
        let mut recoil = Recoil::new(NodeRef::new(HexKey::new(0, 0), Some(target)), Vec2::X, 6.0, 100.0);
        recoil.start(&mut scene).unwrap();
        recoil.update(&mut scene, 20.0).unwrap();
        let x = scene.node(target).unwrap().placement.translation.x;
        assert!((x + 6.0).abs() < 1e-4, "full kick backwards, got {x}");
        assert!(recoil.update(&mut scene, 100.0).unwrap());
        assert!(scene.node(target).unwrap().placement.translation.length() < 1e-4);
    }

    #[test]
    fn overlapping_jostles_return_to_rest() {
        let mut scene = RetainedScene::new();
        let rest = Vec2::new(5.0, 5.0);
        let target = scene.create(None, NodeSpec::new(NodeRole::UnitStack, Shape::Group).at(rest));
        let node = NodeRef::new(HexKey::new(0, 0), Some(target));
        let mut first = Shake::new(node, 4.0, 200.0);
        let mut second = Shake::new(node, 4.0, 200.0);
        let mut recoil = Recoil::new(node, Vec2::Y, 3.0, 150.0);

        first.start(&mut scene).unwrap();
        first.update(&mut scene, 30.0).unwrap();
        second.start(&mut scene).unwrap();
        recoil.start(&mut scene).unwrap();
        second.update(&mut scene, 10.0).unwrap();
        recoil.update(&mut scene, 20.0).unwrap();
        first.update(&mut scene, 60.0).unwrap();

        first.finish(&mut scene);
        recoil.update(&mut scene, 70.0).unwrap();
        recoil.finish(&mut scene);
        second.update(&mut scene, 90.0).unwrap();
        second.finish(&mut scene);
        let at = scene.node(target).unwrap().placement.translation;
        assert!((at - rest).length() < 1e-4, "left at {at}");
    }

    #[test]
    fn sparks_are_deterministic_per_seed() {
        let rays = |seed| {
            let mut scene = RetainedScene::new();
            let mut sparks = Sparks::new(None, anchor(0.0, 0.0), 8, seed, Color::WHITE, 20.0, 100.0);
            sparks.start(&mut scene).unwrap();
            sparks.rays.iter().map(|(_, r)| *r).collect::<Vec<_>>()
        };
        assert_eq!(rays(42), rays(42));
        assert_ne!(rays(42), rays(43));
        assert_eq!(rays(42).len(), 8);
    }

    #[test]
    fn tag_pulse_clears_tag_on_finish() {
        let mut scene = RetainedScene::new();
        let poly = scene.create(None, NodeSpec::new(NodeRole::HexPolygon, Shape::Group));
        let mut pulse = TagPulse::new("flash", NodeRef::new(HexKey::new(0, 0), Some(poly)), "bright", 50.0);
        pulse.start(&mut scene).unwrap();
        assert!(scene.node(poly).unwrap().tags.contains("bright"));
        pulse.finish(&mut scene);
        assert!(!scene.node(poly).unwrap().tags.contains("bright"));
    }
}
