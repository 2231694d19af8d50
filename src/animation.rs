//! Animation Orchestrator: a frame-clocked task scheduler, the effects it
//! runs, and the compositions built on top (unit moves, attack sequences).

pub mod combat;
pub mod effects;
pub mod moves;
pub mod profile;
pub mod scheduler;

pub use combat::{Engagement, compose_attack};
pub use effects::{Anchor, NodeRef};
pub use moves::{MoveBook, MoveHandle, PrimedMove};
pub use profile::{AttackArchetype, CombatVisualProfile, ExplosionStyle};
pub use scheduler::{Completion, Effect, Scheduler, TaskId, TaskState};
