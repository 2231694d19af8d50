//! Error taxonomy for the rendering engine.
//!
//! Public battlefield methods never surface these to callers; they are logged
//! and the smallest unit of work (one effect, one overlay sync) is dropped.
//! Only [`crate::coords::HexKey::parse`] returns them directly.

use thiserror::Error;

use crate::coords::HexKey;

/// Result alias using [`RenderError`].
pub type Result<T> = std::result::Result<T, RenderError>;

/// Recoverable failures inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The hex has no cell (or no child visual) in the current registry.
    #[error("no {what} node for hex {key}")]
    MissingNode {
        /// Which visual was looked up.
        what: &'static str,
        /// The hex that was looked up.
        key: HexKey,
    },

    /// A scene node id no longer exists (removed by a render or cleanup).
    #[error("scene node {0} was removed")]
    DeadNode(u64),

    /// A hex key string could not be parsed.
    #[error("malformed hex key '{0}'")]
    MalformedKey(String),

    /// The unit type has no known visual asset.
    #[error("no sprite for unit type '{0}'")]
    UnknownSprite(String),

    /// A move handle was primed before the latest full render.
    #[error("move handle from epoch {handle} used in epoch {current}")]
    StaleHandle {
        /// Epoch the handle was primed in.
        handle: u64,
        /// Current registry epoch.
        current: u64,
    },
}

impl RenderError {
    /// Shorthand for [`RenderError::MissingNode`].
    pub fn missing(what: &'static str, key: HexKey) -> Self {
        Self::MissingNode { what, key }
    }
}
