//! Minimal retained-mode scene graph.
//!
//! The engine never draws directly; it creates, updates and removes nodes
//! through [`SceneGraph`]. [`RetainedScene`] is the in-memory implementation
//! used by the Bevy presenter and by tests; any other backend (canvas, terminal)
//! only needs to implement the trait.

use std::collections::{BTreeMap, BTreeSet};

use bevy::color::Color;
use bevy::math::Vec2;

use crate::coords::HexKey;

/// Opaque handle to a scene node. Ids are never reused within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// What a node is for. The registry scans roles to rebuild its lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Top-level container created by a full render.
    Layer,
    /// Per-hex container.
    HexCell,
    /// Hex outline/fill.
    HexPolygon,
    /// Coordinate or name label of a hex.
    HexLabel,
    /// Container for 1–4 unit icons.
    UnitStack,
    /// One unit icon inside a stack.
    UnitIcon,
    /// Transport vessel drawn beneath a stack on maritime terrain.
    Boat,
    /// Smoke/flame/wreck overlay container.
    Aftermath,
    /// Selection/zone/campaign highlight.
    Highlight,
    /// Short-lived animation visual (ghost, tracer, flash, burst).
    Effect,
}

/// Geometry of a node, in the node's local space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Invisible grouping node.
    Group,
    /// Closed polygon.
    Polygon(Vec<Vec2>),
    /// Circle centered on the node origin.
    Circle {
        /// Radius in pixels.
        radius: f32,
    },
    /// Line segment from the node origin to `to`.
    Line {
        /// End point relative to the node origin.
        to: Vec2,
        /// Stroke width in pixels.
        width: f32,
    },
    /// Sprite reference resolved by the backend.
    Icon {
        /// Sprite key from the unit catalog.
        sprite: String,
        /// Nominal icon size in pixels before scaling.
        size: f32,
    },
    /// Text.
    Label(String),
}

/// Placement of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Translation in pixels.
    pub translation: Vec2,
    /// Uniform scale.
    pub scale: f32,
    /// Horizontal mirror (unit facing).
    pub mirror_x: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: 1.0,
            mirror_x: false,
        }
    }
}

impl Placement {
    /// Placement at `translation` with unit scale.
    pub fn at(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }
}

/// One retained node.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Parent node, `None` for roots.
    pub parent: Option<NodeId>,
    /// Children in creation order.
    pub children: Vec<NodeId>,
    /// Purpose of the node.
    pub role: NodeRole,
    /// Hex the node belongs to, if any.
    pub hex: Option<HexKey>,
    /// Geometry.
    pub shape: Shape,
    /// Local placement.
    pub placement: Placement,
    /// Fill/stroke color.
    pub color: Color,
    /// Opacity multiplier in `[0, 1]`.
    pub opacity: f32,
    /// Hidden nodes (and their subtrees) are not drawn.
    pub visible: bool,
    /// Visual-state tags (`selected`, `spotted-only`, `zone-move`, ...).
    pub tags: BTreeSet<String>,
}

/// Description of a node to create.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    /// Purpose of the node.
    pub role: NodeRole,
    /// Geometry.
    pub shape: Shape,
    /// Owning hex.
    pub hex: Option<HexKey>,
    /// Local placement.
    pub placement: Placement,
    /// Color.
    pub color: Color,
    /// Initial opacity.
    pub opacity: f32,
}

impl NodeSpec {
    /// A spec with default placement, white color, full opacity.
    pub fn new(role: NodeRole, shape: Shape) -> Self {
        Self {
            role,
            shape,
            hex: None,
            placement: Placement::default(),
            color: Color::WHITE,
            opacity: 1.0,
        }
    }

    /// Sets the owning hex.
    pub fn hex(mut self, key: HexKey) -> Self {
        self.hex = Some(key);
        self
    }

    /// Sets the local translation.
    pub fn at(mut self, translation: Vec2) -> Self {
        self.placement.translation = translation;
        self
    }

    /// Sets the full placement.
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Sets the color.
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the opacity.
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Retained-mode scene graph operations the engine relies on.
///
/// Mutators return `false` when the node no longer exists so callers can
/// degrade to a no-op.
pub trait SceneGraph {
    /// Creates a node under `parent` (or as a root).
    fn create(&mut self, parent: Option<NodeId>, spec: NodeSpec) -> NodeId;
    /// Removes a node and its whole subtree.
    fn remove(&mut self, id: NodeId) -> bool;
    /// Read access to a node.
    fn node(&self, id: NodeId) -> Option<&SceneNode>;
    /// Replaces the local placement.
    fn set_placement(&mut self, id: NodeId, placement: Placement) -> bool;
    /// Replaces the geometry.
    fn set_shape(&mut self, id: NodeId, shape: Shape) -> bool;
    /// Sets the opacity (clamped to `[0, 1]`).
    fn set_opacity(&mut self, id: NodeId, opacity: f32) -> bool;
    /// Shows or hides a node.
    fn set_visible(&mut self, id: NodeId, visible: bool) -> bool;
    /// Adds or removes a visual-state tag.
    fn set_tag(&mut self, id: NodeId, tag: &str, on: bool) -> bool;
    /// Deep-copies a subtree under `parent`; the copy keeps roles and tags.
    fn clone_subtree(&mut self, id: NodeId, parent: Option<NodeId>) -> Option<NodeId>;
    /// All nodes in id (creation) order.
    fn ids(&self) -> Vec<NodeId>;

    /// Whether the node still exists.
    fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Sum of translations from the root down to `id`.
    ///
    /// Scale and mirroring only affect a node's own geometry here; effects
    /// place themselves in absolute pixel space.
    fn world_position(&self, id: NodeId) -> Option<Vec2> {
        let mut node = self.node(id)?;
        let mut pos = node.placement.translation;
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            pos += node.placement.translation;
        }
        Some(pos)
    }

    /// Whether the node and all ancestors are visible.
    fn is_shown(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            match self.node(id) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }
}

/// In-memory [`SceneGraph`].
#[derive(Debug, Default, Clone)]
pub struct RetainedScene {
    nodes: BTreeMap<NodeId, SceneNode>,
    next_id: u64,
}

impl RetainedScene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live nodes with the given role.
    pub fn count_role(&self, role: NodeRole) -> usize {
        self.nodes.values().filter(|n| n.role == role).count()
    }

    /// Iterates all nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    fn with_node(&mut self, id: NodeId, f: impl FnOnce(&mut SceneNode)) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }
}

impl SceneGraph for RetainedScene {
    fn create(&mut self, parent: Option<NodeId>, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        // A dead parent would orphan the node forever; make it a root instead.
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        if let Some(p) = parent
            && let Some(parent_node) = self.nodes.get_mut(&p)
        {
            parent_node.children.push(id);
        }

        self.nodes.insert(
            id,
            SceneNode {
                parent,
                children: Vec::new(),
                role: spec.role,
                hex: spec.hex,
                shape: spec.shape,
                placement: spec.placement,
                color: spec.color,
                opacity: spec.opacity.clamp(0.0, 1.0),
                visible: true,
                tags: BTreeSet::new(),
            },
        );
        id
    }

    fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        if let Some(parent) = node.parent
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|c| *c != id);
        }
        let mut stack = node.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                stack.extend(removed.children);
            }
        }
        true
    }

    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    fn set_placement(&mut self, id: NodeId, placement: Placement) -> bool {
        self.with_node(id, |n| n.placement = placement)
    }

    fn set_shape(&mut self, id: NodeId, shape: Shape) -> bool {
        self.with_node(id, |n| n.shape = shape)
    }

    fn set_opacity(&mut self, id: NodeId, opacity: f32) -> bool {
        self.with_node(id, |n| n.opacity = opacity.clamp(0.0, 1.0))
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        self.with_node(id, |n| n.visible = visible)
    }

    fn set_tag(&mut self, id: NodeId, tag: &str, on: bool) -> bool {
        self.with_node(id, |n| {
            if on {
                n.tags.insert(tag.to_owned());
            } else {
                n.tags.remove(tag);
            }
        })
    }

    fn clone_subtree(&mut self, id: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
        let source = self.nodes.get(&id)?.clone();
        let copy = self.create(
            parent,
            NodeSpec {
                role: source.role,
                shape: source.shape,
                hex: source.hex,
                placement: source.placement,
                color: source.color,
                opacity: source.opacity,
            },
        );
        self.with_node(copy, |n| {
            n.visible = source.visible;
            n.tags = source.tags;
        });
        for child in source.children {
            self.clone_subtree(child, Some(copy));
        }
        Some(copy)
    }

    fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(role: NodeRole) -> NodeSpec {
        NodeSpec::new(role, Shape::Group)
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut scene = RetainedScene::new();
        let root = scene.create(None, group(NodeRole::Layer));
        let cell = scene.create(Some(root), group(NodeRole::HexCell));
        scene.create(Some(cell), group(NodeRole::HexPolygon));
        assert_eq!(scene.len(), 3);

        assert!(scene.remove(cell));
        assert_eq!(scene.len(), 1);
        assert!(scene.node(root).unwrap().children.is_empty());
        assert!(!scene.remove(cell), "second remove is a no-op");
    }

    #[test]
    fn world_position_accumulates_translations() {
        let mut scene = RetainedScene::new();
        let root = scene.create(None, group(NodeRole::Layer).at(Vec2::new(10.0, 5.0)));
        let child = scene.create(Some(root), group(NodeRole::HexCell).at(Vec2::new(1.0, 2.0)));
        assert_eq!(scene.world_position(child), Some(Vec2::new(11.0, 7.0)));
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let mut scene = RetainedScene::new();
        let root = scene.create(None, group(NodeRole::Layer));
        let child = scene.create(Some(root), group(NodeRole::UnitStack));
        assert!(scene.is_shown(child));
        scene.set_visible(root, false);
        assert!(!scene.is_shown(child));
    }

    #[test]
    fn clone_copies_children_and_tags() {
        let mut scene = RetainedScene::new();
        let stack = scene.create(None, group(NodeRole::UnitStack));
        scene.create(
            Some(stack),
            NodeSpec::new(
                NodeRole::UnitIcon,
                Shape::Icon {
                    sprite: "tank".into(),
                    size: 20.0,
                },
            ),
        );
        scene.set_tag(stack, "spotted-only", true);

        let copy = scene.clone_subtree(stack, None).unwrap();
        let node = scene.node(copy).unwrap();
        assert_eq!(node.children.len(), 1);
        assert!(node.tags.contains("spotted-only"));
        assert_eq!(scene.count_role(NodeRole::UnitIcon), 2);
    }

    #[test]
    fn create_under_dead_parent_makes_root() {
        let mut scene = RetainedScene::new();
        let gone = scene.create(None, group(NodeRole::Layer));
        scene.remove(gone);
        let id = scene.create(Some(gone), group(NodeRole::Effect));
        assert_eq!(scene.node(id).unwrap().parent, None);
    }
}
