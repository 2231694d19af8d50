#![warn(missing_docs)]
//! Hex battlefield rendering and combat animation.
//!
//! A retained scene of hex cells, unit stacks and overlays, a registry that
//! caches per-hex nodes between renders, a frame-clocked effect scheduler that
//! composes attack and move animations, turn-driven battle aftermath, and a
//! projector that fits a strategic campaign grid to a fixed canvas. The
//! [`presenter`] module draws all of it inside a Bevy app.

pub mod aftermath;
pub mod animation;
pub mod battlefield;
pub mod campaign;
pub mod catalog;
pub mod coords;
pub mod demo;
pub mod error;
pub mod math;
pub mod presenter;
pub mod registry;
pub mod scenario;
pub mod scene;
pub mod units;

use bevy::prelude::*;

/// Application-wide game state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Normal play: picking, camera and demo keys.
    #[default]
    Running,
    /// Debug overlay active (Tab to toggle).
    Debugging,
}
