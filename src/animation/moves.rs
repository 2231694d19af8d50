//! Unit move priming and playback.
//!
//! A primed move owns a ghost copy of the destination stack parked at the
//! origin hex while the real stack stays hidden. Playing it slides the ghost
//! along its path; finishing, cancelling or disposing it always removes the
//! ghost and shows the real stack again.

use std::collections::HashMap;

use bevy::log::{debug, warn};
use bevy::prelude::*;

use super::scheduler::{Effect, Scheduler, TaskId};
use crate::coords::HexKey;
use crate::error::{RenderError, Result};
use crate::math;
use crate::scene::{NodeId, SceneGraph};

/// A primed move, valid for the registry epoch it was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveHandle {
    id: u64,
    epoch: u64,
}

impl MoveHandle {
    /// Registry epoch the move was primed in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Scene state captured when a move is primed.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimedMove {
    /// Origin hex.
    pub from: HexKey,
    /// Destination hex.
    pub to: HexKey,
    /// Ghost stack under the effects layer.
    pub ghost: NodeId,
    /// Real stack hidden until the move ends.
    pub destination: Option<NodeId>,
    /// Absolute waypoints, origin first. Ground moves have two.
    pub path: Vec<Vec2>,
}

impl PrimedMove {
    fn restore(&self, scene: &mut dyn SceneGraph) {
        scene.remove(self.ghost);
        if let Some(destination) = self.destination {
            scene.set_visible(destination, true);
        }
    }
}

struct GhostMove {
    primed: PrimedMove,
    duration: f32,
}

impl Effect for GhostMove {
    fn label(&self) -> &'static str {
        "unit-move"
    }

    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()> {
        if !scene.contains(self.primed.ghost) {
            return Err(RenderError::DeadNode(self.primed.ghost.0));
        }
        Ok(())
    }

    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool> {
        let ghost = self.primed.ghost;
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            math::clamp_progress(elapsed_ms / self.duration)
        };
        let Some(point) = math::polyline_point(&self.primed.path, math::ease_in_out_cosine(t))
        else {
            return Ok(true);
        };
        let mut placement = scene
            .node(ghost)
            .map(|n| n.placement)
            .ok_or(RenderError::DeadNode(ghost.0))?;
        placement.translation = point;
        scene.set_placement(ghost, placement);
        Ok(t >= 1.0)
    }

    fn finish(&mut self, scene: &mut dyn SceneGraph) {
        self.primed.restore(scene);
    }
}

enum Slot {
    Primed(PrimedMove),
    Playing { task: TaskId, primed: PrimedMove },
}

/// Outstanding move handles.
#[derive(Default)]
pub struct MoveBook {
    next_id: u64,
    slots: HashMap<u64, Slot>,
}

impl MoveBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles that are primed or playing.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// No outstanding handles.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Captured state of an outstanding move.
    pub fn primed(&self, handle: MoveHandle) -> Option<&PrimedMove> {
        match self.slots.get(&handle.id)? {
            Slot::Primed(primed) | Slot::Playing { primed, .. } => Some(primed),
        }
    }

    /// Registers a primed move.
    pub fn insert(&mut self, primed: PrimedMove, epoch: u64) -> MoveHandle {
        let handle = MoveHandle {
            id: self.next_id,
            epoch,
        };
        self.next_id += 1;
        debug!(from = %primed.from, to = %primed.to, handle = handle.id, "move primed");
        self.slots.insert(handle.id, Slot::Primed(primed));
        handle
    }

    /// Starts a primed move.
    ///
    /// Playing an already-playing handle returns its task. A zero duration
    /// finishes instantly. Stale or disposed handles are reported, cleaned up
    /// and return `None`.
    pub fn play(
        &mut self,
        handle: MoveHandle,
        duration_ms: f32,
        epoch: u64,
        scheduler: &mut Scheduler,
        scene: &mut dyn SceneGraph,
    ) -> Option<TaskId> {
        let Some(slot) = self.slots.remove(&handle.id) else {
            warn!(handle = handle.id, "move handle already disposed");
            return None;
        };
        let primed = match slot {
            Slot::Playing { task, primed } => {
                self.slots.insert(handle.id, Slot::Playing { task, primed });
                return Some(task);
            }
            Slot::Primed(primed) => primed,
        };

        if handle.epoch != epoch {
            let err = RenderError::StaleHandle {
                handle: handle.epoch,
                current: epoch,
            };
            warn!(from = %primed.from, to = %primed.to, %err, "disposing stale move");
            primed.restore(scene);
            return None;
        }

        if duration_ms <= 0.0 {
            primed.restore(scene);
            return Some(scheduler.resolved("unit-move"));
        }

        let task = scheduler.spawn(Box::new(GhostMove {
            primed: primed.clone(),
            duration: duration_ms,
        }));
        self.slots.insert(handle.id, Slot::Playing { task, primed });
        Some(task)
    }

    /// Cancels or discards a move and restores the scene.
    ///
    /// Returns `true` the first time and `false` for every later call.
    pub fn dispose(
        &mut self,
        handle: MoveHandle,
        scheduler: &mut Scheduler,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        match self.slots.remove(&handle.id) {
            Some(Slot::Primed(primed)) => {
                primed.restore(scene);
                true
            }
            Some(Slot::Playing { task, primed }) => {
                scheduler.cancel(task, scene);
                primed.restore(scene);
                true
            }
            None => false,
        }
    }

    /// Disposes every outstanding handle.
    pub fn dispose_all(&mut self, scheduler: &mut Scheduler, scene: &mut dyn SceneGraph) {
        let ids: Vec<u64> = self.slots.keys().copied().collect();
        for id in ids {
            match self.slots.remove(&id) {
                Some(Slot::Primed(primed)) => primed.restore(scene),
                Some(Slot::Playing { task, primed }) => {
                    scheduler.cancel(task, scene);
                    primed.restore(scene);
                }
                None => {}
            }
        }
    }

    /// Forgets moves whose playback has finished.
    pub fn prune(&mut self, scheduler: &Scheduler) {
        self.slots.retain(|_, slot| match slot {
            Slot::Primed(_) => true,
            Slot::Playing { task, .. } => !scheduler.is_finished(*task),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeRole, NodeSpec, Placement, RetainedScene, Shape};

    fn primed(scene: &mut RetainedScene) -> PrimedMove {
        let destination = scene.create(
            None,
            NodeSpec::new(NodeRole::UnitStack, Shape::Group).at(Vec2::new(90.0, 0.0)),
        );
        let ghost = scene.clone_subtree(destination, None).unwrap();
        scene.set_placement(ghost, Placement::at(Vec2::ZERO));
        scene.set_visible(destination, false);
        PrimedMove {
            from: HexKey::new(0, 0),
            to: HexKey::new(3, 0),
            ghost,
            destination: Some(destination),
            path: vec![Vec2::ZERO, Vec2::new(90.0, 0.0)],
        }
    }

    fn assert_restored(scene: &RetainedScene, primed: &PrimedMove) {
        assert!(!scene.contains(primed.ghost));
        assert!(scene.node(primed.destination.unwrap()).unwrap().visible);
    }

    #[test]
    fn play_moves_ghost_then_restores() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut book = MoveBook::new();
        let primed = primed(&mut scene);
        let handle = book.insert(primed.clone(), 0);

        let task = book.play(handle, 100.0, 0, &mut scheduler, &mut scene).unwrap();
        scheduler.tick(50.0, &mut scene);
        scheduler.tick(0.0, &mut scene);
        let x = scene.node(primed.ghost).unwrap().placement.translation.x;
        assert!(x > 0.0 && x < 90.0, "ghost mid-way, got {x}");

        scheduler.tick(100.0, &mut scene);
        assert!(scheduler.is_finished(task));
        assert_restored(&scene, &primed);

        book.prune(&scheduler);
        assert!(book.is_empty());
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut book = MoveBook::new();
        let primed = primed(&mut scene);
        let handle = book.insert(primed.clone(), 0);

        assert!(book.dispose(handle, &mut scheduler, &mut scene));
        assert!(!book.dispose(handle, &mut scheduler, &mut scene));
        assert_restored(&scene, &primed);
        assert!(book.play(handle, 100.0, 0, &mut scheduler, &mut scene).is_none());
    }

    #[test]
    fn dispose_while_playing_snaps_back() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut book = MoveBook::new();
        let primed = primed(&mut scene);
        let handle = book.insert(primed.clone(), 0);

        let task = book.play(handle, 500.0, 0, &mut scheduler, &mut scene).unwrap();
        scheduler.tick(100.0, &mut scene);
        assert!(book.dispose(handle, &mut scheduler, &mut scene));
        assert!(scheduler.is_finished(task));
        assert_restored(&scene, &primed);
    }

    #[test]
    fn zero_duration_restores_immediately() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut book = MoveBook::new();
        let primed = primed(&mut scene);
        let handle = book.insert(primed.clone(), 0);

        let task = book.play(handle, 0.0, 0, &mut scheduler, &mut scene).unwrap();
        assert!(scheduler.is_finished(task));
        assert_restored(&scene, &primed);
        assert!(book.is_empty());
    }

    #[test]
    fn stale_handle_is_disposed_not_played() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut book = MoveBook::new();
        let primed = primed(&mut scene);
        let handle = book.insert(primed.clone(), 1);

        assert!(book.play(handle, 100.0, 2, &mut scheduler, &mut scene).is_none());
        assert!(scheduler.is_idle());
        assert_restored(&scene, &primed);
        assert!(!book.dispose(handle, &mut scheduler, &mut scene));
    }

    #[test]
    fn playing_twice_returns_same_task() {
        let mut scene = RetainedScene::new();
        let mut scheduler = Scheduler::new();
        let mut book = MoveBook::new();
        let handle = book.insert(primed(&mut scene), 0);
        let first = book.play(handle, 100.0, 0, &mut scheduler, &mut scene);
        let second = book.play(handle, 100.0, 0, &mut scheduler, &mut scene);
        assert_eq!(first, second);
    }
}
