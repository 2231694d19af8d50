use std::collections::{BTreeMap, BTreeSet};

use bevy::prelude::*;

use crate::coords::HexKey;

/// Tag on selected hex polygons.
pub const SELECTED_TAG: &str = "selected";
/// Tag on unit stacks that still have orders to give.
pub const IDLE_TAG: &str = "idle-unit";

/// Kind of zone overlay on a hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub enum ZoneKind {
    /// Reachable this turn.
    Move,
    /// Within weapon range.
    Attack,
    /// Deployment or supply area.
    Deploy,
}

impl ZoneKind {
    /// Every kind, for clearing tags.
    pub const ALL: [ZoneKind; 3] = [ZoneKind::Move, ZoneKind::Attack, ZoneKind::Deploy];

    /// Visual-state tag for the kind.
    pub fn tag(self) -> &'static str {
        match self {
            ZoneKind::Move => "zone-move",
            ZoneKind::Attack => "zone-attack",
            ZoneKind::Deploy => "zone-deploy",
        }
    }
}

/// Selection, zone and idle-unit highlight state, kept across renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Selected hexes.
    pub selected: BTreeSet<HexKey>,
    /// Zone overlays.
    pub zones: BTreeMap<HexKey, ZoneKind>,
    /// Hexes whose units are idle.
    pub idle: BTreeSet<HexKey>,
    /// Whether idle units are currently highlighted.
    pub idle_visible: bool,
}

impl SelectionState {
    /// Replaces the selection; returns whether it changed.
    pub fn select(&mut self, keys: impl IntoIterator<Item = HexKey>) -> bool {
        let next: BTreeSet<HexKey> = keys.into_iter().collect();
        if next == self.selected {
            return false;
        }
        self.selected = next;
        true
    }

    /// Hexes whose tags differ between `self` and `previous`.
    pub fn touched(&self, previous: &SelectionState) -> BTreeSet<HexKey> {
        let mut keys = BTreeSet::new();
        keys.extend(self.selected.symmetric_difference(&previous.selected));
        keys.extend(self.idle.symmetric_difference(&previous.idle));
        for key in self.zones.keys().chain(previous.zones.keys()) {
            if self.zones.get(key) != previous.zones.get(key) {
                keys.insert(*key);
            }
        }
        if self.idle_visible != previous.idle_visible {
            keys.extend(self.idle.iter().chain(previous.idle.iter()));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_reports_changes_only() {
        let mut state = SelectionState::default();
        assert!(state.select([HexKey::new(1, 1)]));
        assert!(!state.select([HexKey::new(1, 1)]));
        assert!(state.select([]));
    }

    #[test]
    fn touched_covers_every_difference() {
        let before = SelectionState::default();
        let mut after = before.clone();
        after.select([HexKey::new(0, 0)]);
        after.zones.insert(HexKey::new(2, 2), ZoneKind::Attack);
        after.idle.insert(HexKey::new(3, 3));
        let touched = after.touched(&before);
        assert!(touched.contains(&HexKey::new(0, 0)));
        assert!(touched.contains(&HexKey::new(2, 2)));
        assert!(touched.contains(&HexKey::new(3, 3)));
        assert_eq!(touched.len(), 3);
    }
}
