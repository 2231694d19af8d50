//! Aftermath State Machine: persistent battle damage per hex.
//!
//! `none → damaged(smoke 1|2, flames?) → wrecked`. Damaged entries burn out
//! and disappear; wrecks stop smoking when their fire turns run out but stay
//! until explicitly cleared.

pub mod overlay;

use std::collections::BTreeMap;

use bevy::log::debug;
use bevy::prelude::*;

use crate::catalog::UnitClass;
use crate::coords::HexKey;
use crate::scene::NodeId;

pub use overlay::{WreckShape, draw_overlay};

/// Strength at or below which a damaged vehicle is critical.
pub const CRITICAL_STRENGTH: f32 = 49.0;

/// Smoke density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Reflect)]
pub enum SmokeLevel {
    /// No smoke.
    #[default]
    None,
    /// Thin smoke.
    Light,
    /// Thick black smoke.
    Heavy,
}

impl SmokeLevel {
    /// Numeric level 0–2.
    pub fn level(self) -> u8 {
        match self {
            SmokeLevel::None => 0,
            SmokeLevel::Light => 1,
            SmokeLevel::Heavy => 2,
        }
    }
}

/// Battle damage on one hex.
#[derive(Debug, Clone, PartialEq)]
pub struct AftermathEntry {
    /// Smoke density.
    pub smoke: SmokeLevel,
    /// Whether flames are drawn.
    pub flames: bool,
    /// Whether a wreck silhouette is drawn.
    pub wreck: bool,
    /// Turns left before smoke and flames go out.
    pub fire_turns_remaining: u32,
    /// Class of the unit that was hit; picks the wreck silhouette.
    pub class: UnitClass,
    /// Overlay node, when drawn.
    pub node: Option<NodeId>,
}

impl AftermathEntry {
    /// Wreck silhouette for this entry, if any.
    pub fn wreck_shape(&self) -> Option<WreckShape> {
        self.wreck.then(|| {
            if self.class.is_vehicle() {
                WreckShape::Hull
            } else {
                WreckShape::Debris
            }
        })
    }

    /// Emits smoke or fire.
    pub fn is_burning(&self) -> bool {
        self.smoke != SmokeLevel::None || self.flames
    }
}

/// What a turn advance changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TurnReport {
    /// Entries that changed appearance and need their overlay redrawn.
    pub changed: Vec<HexKey>,
    /// Removed entries and the overlay node they owned.
    pub expired: Vec<(HexKey, Option<NodeId>)>,
}

/// Aftermath entries by hex.
#[derive(Debug, Default, Clone)]
pub struct AftermathBook {
    entries: BTreeMap<HexKey, AftermathEntry>,
}

impl AftermathBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for a hex.
    pub fn get(&self, key: HexKey) -> Option<&AftermathEntry> {
        self.entries.get(&key)
    }

    /// Mutable entry for a hex.
    pub fn get_mut(&mut self, key: HexKey) -> Option<&mut AftermathEntry> {
        self.entries.get_mut(&key)
    }

    /// Number of hexes with damage.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No damage anywhere.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (HexKey, &AftermathEntry)> {
        self.entries.iter().map(|(k, e)| (*k, e))
    }

    /// Records a damaged vehicle. Other classes leave no trace and return
    /// `false`.
    ///
    /// A wreck already on the hex stays; it picks up the heavier smoke and the
    /// longer burn.
    pub fn mark_damaged(
        &mut self,
        key: HexKey,
        class: UnitClass,
        strength_after: f32,
        turns: u32,
    ) -> bool {
        if !class.is_vehicle() {
            return false;
        }
        let critical = strength_after <= CRITICAL_STRENGTH;
        let (smoke, flames) = if critical {
            (SmokeLevel::Heavy, true)
        } else {
            (SmokeLevel::Light, false)
        };

        match self.entries.get_mut(&key) {
            Some(entry) if entry.wreck => {
                entry.smoke = entry.smoke.max(smoke);
                entry.flames |= flames;
                entry.fire_turns_remaining = entry.fire_turns_remaining.max(turns);
            }
            Some(entry) => {
                entry.smoke = smoke;
                entry.flames = flames;
                entry.fire_turns_remaining = turns;
                entry.class = class;
            }
            None => {
                self.entries.insert(
                    key,
                    AftermathEntry {
                        smoke,
                        flames,
                        wreck: false,
                        fire_turns_remaining: turns,
                        class,
                        node: None,
                    },
                );
            }
        }
        debug!(hex = %key, ?smoke, flames, turns, "hex damaged");
        true
    }

    /// Records a destroyed unit. Vehicles burn with heavy smoke for
    /// `fire_turns`; anything else, or a zero-turn fire, leaves a cold wreck.
    pub fn mark_wrecked(&mut self, key: HexKey, class: UnitClass, fire_turns: u32) {
        let burning = class.is_vehicle() && fire_turns > 0;
        let node = self.entries.get(&key).and_then(|e| e.node);
        self.entries.insert(
            key,
            AftermathEntry {
                smoke: if burning {
                    SmokeLevel::Heavy
                } else {
                    SmokeLevel::None
                },
                flames: burning,
                wreck: true,
                fire_turns_remaining: if burning { fire_turns } else { 0 },
                class,
                node,
            },
        );
        debug!(hex = %key, ?class, burning, "hex wrecked");
    }

    /// Ages every entry by one turn.
    pub fn advance_turn(&mut self) -> TurnReport {
        let mut report = TurnReport::default();
        for (key, entry) in &mut self.entries {
            if entry.wreck {
                entry.fire_turns_remaining = entry.fire_turns_remaining.saturating_sub(1);
                if entry.fire_turns_remaining == 0 && entry.is_burning() {
                    entry.smoke = SmokeLevel::None;
                    entry.flames = false;
                    report.changed.push(*key);
                }
            } else {
                entry.fire_turns_remaining = entry.fire_turns_remaining.saturating_sub(1);
                if entry.fire_turns_remaining == 0 {
                    report.expired.push((*key, entry.node));
                }
            }
        }
        for (key, _) in &report.expired {
            self.entries.remove(key);
        }
        debug!(
            changed = report.changed.len(),
            expired = report.expired.len(),
            "aftermath turn advanced"
        );
        report
    }

    /// Removes one entry.
    pub fn clear(&mut self, key: HexKey) -> Option<AftermathEntry> {
        self.entries.remove(&key)
    }

    /// Removes every entry.
    pub fn reset(&mut self) -> Vec<(HexKey, AftermathEntry)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    /// Drops entries whose hex fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(HexKey) -> bool) {
        self.entries.retain(|key, _| keep(*key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> HexKey {
        HexKey::parse("5,5").unwrap()
    }

    // ── wrecks ──

    #[test]
    fn tank_wreck_burns_out_but_stays() {
        let mut book = AftermathBook::new();
        book.mark_wrecked(key(), UnitClass::Tank, 2);
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames, e.fire_turns_remaining), (SmokeLevel::Heavy, true, 2));

        book.advance_turn();
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames, e.fire_turns_remaining), (SmokeLevel::Heavy, true, 1));

        let report = book.advance_turn();
        assert_eq!(report.changed, vec![key()]);
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames, e.wreck), (SmokeLevel::None, false, true));

        let report = book.advance_turn();
        assert!(report.changed.is_empty() && report.expired.is_empty());
        assert!(book.get(key()).unwrap().wreck);
    }

    #[test]
    fn infantry_wreck_is_cold_debris() {
        let mut book = AftermathBook::new();
        book.mark_wrecked(key(), UnitClass::Infantry, 3);
        let e = book.get(key()).unwrap();
        assert!(!e.is_burning());
        assert_eq!(e.fire_turns_remaining, 0);
        assert_eq!(e.wreck_shape(), Some(WreckShape::Debris));
    }

    // ── damage ──

    #[test]
    fn zero_turn_vehicle_wreck_is_cold() {
        let mut book = AftermathBook::new();
        book.mark_wrecked(key(), UnitClass::Tank, 0);
        let e = book.get(key()).unwrap();
        assert!(e.wreck && !e.is_burning());
        assert_eq!(e.wreck_shape(), Some(WreckShape::Hull));
        for _ in 0..5 {
            book.advance_turn();
        }
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames, e.fire_turns_remaining), (SmokeLevel::None, false, 0));
    }

    #[test]
    fn burnt_out_wreck_hit_again_smokes_out_next_turn() {
        let mut book = AftermathBook::new();
        book.mark_wrecked(key(), UnitClass::Tank, 1);
        book.advance_turn();
        book.mark_damaged(key(), UnitClass::Tank, 10.0, 0);
        assert!(book.get(key()).unwrap().flames);

        let report = book.advance_turn();
        assert_eq!(report.changed, vec![key()]);
        let e = book.get(key()).unwrap();
        assert!(e.wreck && !e.is_burning());
    }

    #[test]
    fn light_damage_smokes_then_expires() {
        let mut book = AftermathBook::new();
        assert!(book.mark_damaged(key(), UnitClass::Vehicle, 75.0, 2));
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames), (SmokeLevel::Light, false));

        assert!(book.advance_turn().expired.is_empty());
        let report = book.advance_turn();
        assert_eq!(report.expired.len(), 1);
        assert!(book.get(key()).is_none());
    }

    #[test]
    fn critical_damage_burns_then_expires() {
        let mut book = AftermathBook::new();
        assert!(book.mark_damaged(key(), UnitClass::Vehicle, 30.0, 2));
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames), (SmokeLevel::Heavy, true));

        assert!(book.advance_turn().expired.is_empty());
        assert!(book.get(key()).is_some());
        let report = book.advance_turn();
        assert_eq!(report.expired.len(), 1);
        assert!(book.get(key()).is_none());
    }

    #[test]
    fn healthy_vehicle_only_smokes() {
        let mut book = AftermathBook::new();
        book.mark_damaged(key(), UnitClass::Tank, 80.0, 1);
        let e = book.get(key()).unwrap();
        assert_eq!((e.smoke, e.flames), (SmokeLevel::Light, false));
        assert_eq!(e.wreck_shape(), None);
    }

    #[test]
    fn non_vehicle_damage_is_ignored() {
        let mut book = AftermathBook::new();
        assert!(!book.mark_damaged(key(), UnitClass::Infantry, 10.0, 2));
        assert!(book.is_empty());
    }

    #[test]
    fn damage_on_wreck_keeps_wreck() {
        let mut book = AftermathBook::new();
        book.mark_wrecked(key(), UnitClass::Tank, 1);
        book.advance_turn();
        book.mark_damaged(key(), UnitClass::Vehicle, 70.0, 3);
        let e = book.get(key()).unwrap();
        assert!(e.wreck);
        assert_eq!((e.smoke, e.fire_turns_remaining), (SmokeLevel::Light, 3));
    }

    // ── cleanup ──

    #[test]
    fn clear_and_reset() {
        let mut book = AftermathBook::new();
        book.mark_wrecked(key(), UnitClass::Tank, 2);
        book.mark_wrecked(HexKey::new(1, 1), UnitClass::Infantry, 0);
        assert!(book.clear(key()).is_some());
        assert!(book.clear(key()).is_none());
        assert_eq!(book.reset().len(), 1);
        assert!(book.is_empty());
    }
}
