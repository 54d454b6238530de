//! Action cache with a one-epoch time-to-live
//!
//! Maps a [`MaskKey`] to the probability vector the policy returned for it
//! and the time it was stored. An entry older than the gather period is
//! stale and must be refreshed by a new policy query.

use std::collections::BTreeMap;
use std::time::Duration;

use starmesh_core::{Direction, DirectionSet, SimTime};

use crate::mask::MaskKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub probabilities: [f64; 4],
    pub stored_at: SimTime,
}

#[derive(Debug, Clone)]
pub struct ActionCache {
    entries: BTreeMap<MaskKey, CacheEntry>,
    ttl: Duration,
}

impl ActionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            ttl,
        }
    }

    fn is_live(&self, entry: &CacheEntry, now: SimTime) -> bool {
        now.since(entry.stored_at) < self.ttl
    }

    /// Probabilities for `key` if stored less than one epoch ago
    pub fn fresh(&self, key: &MaskKey, now: SimTime) -> Option<[f64; 4]> {
        self.entries
            .get(key)
            .filter(|e| self.is_live(e, now))
            .map(|e| e.probabilities)
    }

    /// Whether `key` has ever been stored
    pub fn contains(&self, key: &MaskKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn store(&mut self, key: MaskKey, probabilities: [f64; 4], now: SimTime) {
        self.entries.insert(
            key,
            CacheEntry {
                probabilities,
                stored_at: now,
            },
        );
    }

    /// Probability mass per direction summed across live entries
    pub fn busyness(&self, now: SimTime) -> [f64; 4] {
        let mut out = [0.0; 4];
        for entry in self.entries.values().filter(|e| self.is_live(e, now)) {
            for (acc, p) in out.iter_mut().zip(entry.probabilities) {
                *acc += p;
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sample a direction from `probabilities` using a uniform `draw` in [0, 1).
///
/// Walks directions in slot order accumulating probability and returns the
/// first whose cumulative sum reaches the draw (`draw <= sum`). If rounding
/// leaves no such direction, returns the most probable one (lowest slot on
/// ties).
pub fn sample_direction(probabilities: &[f64; 4], draw: f64) -> Direction {
    let mut cumulative = 0.0;
    for direction in Direction::ALL {
        cumulative += probabilities[direction.index()];
        if draw <= cumulative {
            return direction;
        }
    }
    most_probable(probabilities, DirectionSet::FULL).unwrap_or(Direction::OrbitNext)
}

/// Most probable direction within `allowed`, lowest slot on ties
pub fn most_probable(probabilities: &[f64; 4], allowed: DirectionSet) -> Option<Direction> {
    let mut best: Option<(Direction, f64)> = None;
    for direction in allowed.iter() {
        let p = probabilities[direction.index()];
        match best {
            Some((_, current)) if p <= current => {}
            _ => best = Some((direction, p)),
        }
    }
    best.map(|(direction, _)| direction)
}
