use std::collections::{BTreeMap, VecDeque};

use bevy::log::{debug, warn};

use crate::error::Result;
use crate::scene::SceneGraph;

/// Completions kept for [`Scheduler::completion_log`].
const LOG_CAPACITY: usize = 1024;

/// A resumable visual effect advanced by the scheduler's frame clock.
///
/// Lifecycle: `start` once, `update` every tick until it reports done, then
/// `finish` exactly once. `finish` is also the cancellation path: it must snap
/// the scene to a consistent state and release any temporary nodes.
pub trait Effect: Send + Sync {
    /// Short name for logs and instrumentation.
    fn label(&self) -> &'static str;

    /// Creates temporary nodes. An error aborts only this effect.
    fn start(&mut self, scene: &mut dyn SceneGraph) -> Result<()>;

    /// Advances to `elapsed_ms` since the scheduled start; `Ok(true)` when done.
    fn update(&mut self, scene: &mut dyn SceneGraph, elapsed_ms: f32) -> Result<bool>;

    /// Snaps to a final state and removes temporary nodes.
    fn finish(&mut self, scene: &mut dyn SceneGraph);
}

/// Identity of a scheduled task. Ids grow monotonically, so id order is
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Task lifecycle: pending → running → done | cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for its start time or dependency.
    Pending,
    /// Started; updated every tick.
    Running,
    /// Completed (including effects that aborted on a missing node).
    Done,
    /// Cancelled before completing.
    Cancelled,
}

impl TaskState {
    /// Done or cancelled.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// One entry of the completion log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    /// The task.
    pub task: TaskId,
    /// Its label.
    pub label: &'static str,
    /// Scheduler time of completion.
    pub at_ms: f32,
    /// Final state.
    pub state: TaskState,
}

enum Start {
    At(f32),
    After { dep: TaskId, delay: f32 },
}

enum Body {
    Effect(Box<dyn Effect>),
    Join(Vec<TaskId>),
    Instant,
}

struct Task {
    label: &'static str,
    state: TaskState,
    start: Start,
    started_at: f32,
    body: Body,
}

/// Frame-clocked cooperative task scheduler.
///
/// Nothing runs between ticks. Within a tick tasks are visited in id order,
/// so children finish before the joins that wait on them and a join's
/// completion is always logged after every child's.
#[derive(Default)]
pub struct Scheduler {
    now: f32,
    next_id: u64,
    tasks: BTreeMap<TaskId, Task>,
    log: VecDeque<Completion>,
}

impl Scheduler {
    /// Empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an effect on the next tick.
    pub fn spawn(&mut self, effect: Box<dyn Effect>) -> TaskId {
        self.spawn_after(0.0, effect)
    }

    /// Starts an effect `delay_ms` from now.
    pub fn spawn_after(&mut self, delay_ms: f32, effect: Box<dyn Effect>) -> TaskId {
        let label = effect.label();
        self.insert(label, Start::At(self.now + delay_ms.max(0.0)), Body::Effect(effect))
    }

    /// Starts an effect `delay_ms` after `dep` finishes (done or cancelled).
    pub fn after(&mut self, dep: TaskId, delay_ms: f32, effect: Box<dyn Effect>) -> TaskId {
        let label = effect.label();
        self.insert(
            label,
            Start::After {
                dep,
                delay: delay_ms.max(0.0),
            },
            Body::Effect(effect),
        )
    }

    /// Join: finishes once every child has finished.
    pub fn all(&mut self, label: &'static str, children: Vec<TaskId>) -> TaskId {
        if children.is_empty() {
            return self.resolved(label);
        }
        self.insert(label, Start::At(self.now), Body::Join(children))
    }

    /// Starts `effects` at `step_ms` intervals in declared order and joins them.
    pub fn stagger(
        &mut self,
        label: &'static str,
        step_ms: f32,
        effects: Vec<Box<dyn Effect>>,
    ) -> TaskId {
        let children = effects
            .into_iter()
            .enumerate()
            .map(|(i, effect)| self.spawn_after(step_ms * i as f32, effect))
            .collect();
        self.all(label, children)
    }

    /// Like [`Scheduler::stagger`] but the first child waits for `dep`.
    pub fn stagger_after(
        &mut self,
        label: &'static str,
        dep: TaskId,
        step_ms: f32,
        effects: Vec<Box<dyn Effect>>,
    ) -> TaskId {
        let children = effects
            .into_iter()
            .enumerate()
            .map(|(i, effect)| self.after(dep, step_ms * i as f32, effect))
            .collect();
        self.all(label, children)
    }

    /// A task that is already done.
    pub fn resolved(&mut self, label: &'static str) -> TaskId {
        let id = self.insert(label, Start::At(self.now), Body::Instant);
        self.complete(id, TaskState::Done);
        id
    }

    /// State of a task; `None` once pruned or never issued.
    pub fn status(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.get(&id).map(|t| t.state)
    }

    /// True when the task is done, cancelled, or already pruned.
    pub fn is_finished(&self, id: TaskId) -> bool {
        match self.tasks.get(&id) {
            Some(task) => task.state.is_finished(),
            None => id.0 < self.next_id,
        }
    }

    /// Nothing pending or running.
    pub fn is_idle(&self) -> bool {
        self.tasks.values().all(|t| t.state.is_finished())
    }

    /// Recent completions in the order they happened.
    pub fn completion_log(&self) -> impl Iterator<Item = &Completion> {
        self.log.iter()
    }

    /// Completion time of a task, if still in the log.
    pub fn completed_at(&self, id: TaskId) -> Option<f32> {
        self.log.iter().find(|c| c.task == id).map(|c| c.at_ms)
    }

    /// Cancels a task (and, for joins, every unfinished child).
    ///
    /// Running effects snap through [`Effect::finish`]. Cancelling a finished
    /// task is a no-op and returns `false`.
    pub fn cancel(&mut self, id: TaskId, scene: &mut dyn SceneGraph) -> bool {
        let Some(task) = self.tasks.get_mut(&id) else {
            return false;
        };
        if task.state.is_finished() {
            return false;
        }
        let was_running = task.state == TaskState::Running;
        let children = match &mut task.body {
            Body::Effect(effect) => {
                if was_running {
                    effect.finish(scene);
                }
                Vec::new()
            }
            Body::Join(children) => children.clone(),
            Body::Instant => Vec::new(),
        };
        for child in children {
            self.cancel(child, scene);
        }
        self.complete(id, TaskState::Cancelled);
        true
    }

    /// Cancels everything that is still pending or running.
    pub fn cancel_all(&mut self, scene: &mut dyn SceneGraph) {
        let ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        for id in ids {
            self.cancel(id, scene);
        }
    }

    /// Drops finished task records. Their ids stay [`Scheduler::is_finished`].
    pub fn prune_finished(&mut self) {
        self.tasks.retain(|_, t| !t.state.is_finished());
    }

    /// Advances the clock by `dt_ms` and steps every task once.
    pub fn tick(&mut self, dt_ms: f32, scene: &mut dyn SceneGraph) {
        self.now += dt_ms.max(0.0);
        let ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        for id in ids {
            self.step(id, scene);
        }
        if self.is_idle() {
            self.prune_finished();
        }
    }

    fn step(&mut self, id: TaskId, scene: &mut dyn SceneGraph) {
        let now = self.now;

        let state = match self.tasks.get(&id) {
            Some(task) => task.state,
            None => return,
        };

        if state == TaskState::Pending {
            let Some(start_at) = self.start_time(id) else {
                return;
            };
            if now < start_at {
                return;
            }
            let Some(task) = self.tasks.get_mut(&id) else {
                return;
            };
            task.state = TaskState::Running;
            task.started_at = start_at;
            if let Body::Effect(effect) = &mut task.body
                && let Err(err) = effect.start(scene)
            {
                warn!(effect = task.label, %err, "effect skipped");
                effect.finish(scene);
                self.complete(id, TaskState::Done);
                return;
            }
        }

        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };
        if task.state != TaskState::Running {
            return;
        }
        let elapsed = now - task.started_at;
        let done = match &mut task.body {
            Body::Effect(effect) => match effect.update(scene, elapsed) {
                Ok(done) => {
                    if done {
                        effect.finish(scene);
                    }
                    done
                }
                Err(err) => {
                    warn!(effect = task.label, %err, "effect aborted");
                    effect.finish(scene);
                    true
                }
            },
            Body::Join(children) => {
                let children = children.clone();
                children.iter().all(|c| self.is_finished(*c))
            }
            Body::Instant => true,
        };
        if done {
            self.complete(id, TaskState::Done);
        }
    }

    fn start_time(&self, id: TaskId) -> Option<f32> {
        let task = self.tasks.get(&id)?;
        match task.start {
            Start::At(t) => Some(t),
            Start::After { dep, delay } => {
                if !self.is_finished(dep) {
                    return None;
                }
                // A pruned dependency finished at or before the current tick.
                let done_at = self.completed_at(dep).unwrap_or(self.now);
                Some(done_at + delay)
            }
        }
    }

    fn insert(&mut self, label: &'static str, start: Start, body: Body) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            Task {
                label,
                state: TaskState::Pending,
                start,
                started_at: self.now,
                body,
            },
        );
        id
    }

    fn complete(&mut self, id: TaskId, state: TaskState) {
        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };
        task.state = state;
        // Release the effect's captured data early; the record stays for status.
        task.body = Body::Instant;
        debug!(task = id.0, label = task.label, ?state, at = self.now, "task finished");
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(Completion {
            task: id,
            label: task.label,
            at_ms: self.now,
            state,
        });
    }
}
