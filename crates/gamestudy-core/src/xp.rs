//! Experience points and leveling.
//!
//! Only `total_xp` is stored. Level, in-level progress and the next
//! threshold are re-derived from it in full on every change, so a
//! persisted value is always self-consistent.
//!
//! The threshold to advance from level `L` to `L + 1` is
//! `floor(BASE_XP * LEVEL_FACTOR^(L - 1))`:
//!
//! ```text
//! level  threshold  cumulative at level start
//!   1       100         0
//!   2       150       100
//!   3       225       250
//!   4       337       475
//! ```

use serde::{Deserialize, Serialize};

use crate::observe::{Observable, SubscriptionId};
use crate::storage::Storage;

pub const BASE_XP: u64 = 100;
pub const LEVEL_FACTOR: f64 = 1.5;

const XP_KEY: &str = "xp";

/// XP needed to advance from `level` to `level + 1`.
///
/// Levels start at 1; `0` is treated as `1`.
pub fn threshold_for_level(level: u32) -> u64 {
    let exponent = level.max(1) - 1;
    let raw = BASE_XP as f64 * LEVEL_FACTOR.powi(exponent as i32);
    if raw >= u64::MAX as f64 {
        u64::MAX
    } else {
        raw.floor() as u64
    }
}

/// Derived leveling snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpState {
    pub total_xp: u64,
    pub level: u32,
    pub current_level_xp: u64,
    pub xp_to_next_level: u64,
}

impl XpState {
    pub fn from_total(total_xp: u64) -> Self {
        let mut level = 1u32;
        let mut remaining = total_xp;
        let mut threshold = threshold_for_level(level);

        while remaining >= threshold {
            remaining -= threshold;
            level += 1;
            threshold = threshold_for_level(level);
        }

        Self {
            total_xp,
            level,
            current_level_xp: remaining,
            xp_to_next_level: threshold,
        }
    }

    /// Percentage through the current level, in `[0, 100)`.
    pub fn level_progress(&self) -> f64 {
        if self.xp_to_next_level == 0 {
            return 0.0;
        }
        self.current_level_xp as f64 / self.xp_to_next_level as f64 * 100.0
    }
}

impl Default for XpState {
    fn default() -> Self {
        Self::from_total(0)
    }
}

/// Owns the XP counter.
pub struct XpLedger {
    storage: Storage,
    state: Observable<XpState>,
}

impl XpLedger {
    /// Load the stored total and derive the rest.
    pub fn load(storage: Storage) -> Self {
        let total = storage.get::<u64>(XP_KEY).unwrap_or(0);
        Self {
            storage,
            state: Observable::new(XpState::from_total(total)),
        }
    }

    pub fn state(&self) -> XpState {
        self.state.get()
    }

    pub fn total_xp(&self) -> u64 {
        self.state.get().total_xp
    }

    pub fn level(&self) -> u32 {
        self.state.get().level
    }

    /// Add `amount` XP. Zero is ignored.
    ///
    /// Returns the new snapshot, or `None` when nothing changed.
    pub fn add_xp(&mut self, amount: u64) -> Option<XpState> {
        if amount == 0 {
            tracing::debug!("ignoring zero xp grant");
            return None;
        }
        let before = self.state.get();
        let next = XpState::from_total(before.total_xp.saturating_add(amount));

        self.storage.set(XP_KEY, &next.total_xp);
        self.state.publish(next);

        if next.level > before.level {
            tracing::info!(level = next.level, total_xp = next.total_xp, "level up");
        }
        Some(next)
    }

    pub fn level_progress(&self) -> f64 {
        self.state.get().level_progress()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&XpState) + Send + Sync + 'static,
    {
        self.state.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn thresholds_grow_geometrically() {
        assert_eq!(threshold_for_level(0), 100);
        assert_eq!(threshold_for_level(1), 100);
        assert_eq!(threshold_for_level(2), 150);
        assert_eq!(threshold_for_level(3), 225);
        assert_eq!(threshold_for_level(4), 337);
    }

    #[test]
    fn fresh_state_is_level_one() {
        let s = XpState::from_total(0);
        assert_eq!(s.level, 1);
        assert_eq!(s.current_level_xp, 0);
        assert_eq!(s.xp_to_next_level, 100);
    }

    #[test]
    fn exact_threshold_levels_up() {
        let s = XpState::from_total(100);
        assert_eq!(s.level, 2);
        assert_eq!(s.current_level_xp, 0);
        assert_eq!(s.xp_to_next_level, 150);

        let s = XpState::from_total(249);
        assert_eq!(s.level, 2);
        assert_eq!(s.current_level_xp, 149);

        let s = XpState::from_total(250);
        assert_eq!(s.level, 3);
        assert_eq!(s.current_level_xp, 0);
        assert_eq!(s.xp_to_next_level, 225);
    }

    #[test]
    fn progress_is_percentage_of_threshold() {
        let s = XpState::from_total(175);
        assert_eq!(s.level, 2);
        assert!((s.level_progress() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn huge_totals_terminate() {
        let s = XpState::from_total(u64::MAX);
        assert!(s.level > 1);
        assert!(s.current_level_xp < s.xp_to_next_level);
    }

    #[test]
    fn add_xp_persists_only_total() {
        let storage = Storage::memory();
        let mut ledger = XpLedger::load(storage.clone());
        assert!(ledger.add_xp(0).is_none());
        let s = ledger.add_xp(120).unwrap();
        assert_eq!(s.level, 2);
        assert_eq!(storage.get::<u64>("xp"), Some(120));

        let reloaded = XpLedger::load(storage);
        assert_eq!(reloaded.state(), s);
    }

    #[test]
    fn late_subscriber_sees_current_level_first() {
        let mut ledger = XpLedger::load(Storage::memory());
        ledger.add_xp(120);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = ledger.subscribe(move |state| sink.lock().unwrap().push(*state));
        ledger.add_xp(30);
        assert!(ledger.unsubscribe(id));
        ledger.add_xp(500);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].total_xp, 120);
        assert_eq!(seen[0].level, 2);
        assert_eq!(seen[1].total_xp, 150);
    }
}
