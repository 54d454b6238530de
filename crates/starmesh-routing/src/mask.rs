//! Approach/away classification and the action mask key
//!
//! A mask key encodes one digit per direction:
//! `approach + 2 * feasible`, giving
//!
//! | digit | meaning                                  |
//! |-------|------------------------------------------|
//! | `0`   | neither                                  |
//! | `1`   | approach candidate, not feasible         |
//! | `2`   | feasible but away from the destination   |
//! | `3`   | approach candidate and feasible          |
//!
//! Two decisions with the same key are treated as the same decision
//! context and share a cached policy response.

use std::fmt;

use starmesh_core::{Direction, DirectionSet};

/// Cache and accumulator key for one decision context
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaskKey(String);

impl MaskKey {
    pub fn new(approach: DirectionSet, feasible: DirectionSet) -> Self {
        let key = mask_digits(approach, feasible)
            .iter()
            .map(|d| char::from(b'0' + d))
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Per-direction digits, as reported to the policy
    pub fn digits(&self) -> [u8; 4] {
        let mut out = [0u8; 4];
        for (slot, byte) in out.iter_mut().zip(self.0.bytes()) {
            *slot = byte - b'0';
        }
        out
    }
}

impl fmt::Display for MaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-direction digits for an approach set and a feasible set
pub fn mask_digits(approach: DirectionSet, feasible: DirectionSet) -> [u8; 4] {
    Direction::ALL.map(|d| u8::from(approach.contains(d)) + 2 * u8::from(feasible.contains(d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key_digits() {
        let approach: DirectionSet = [Direction::OrbitNext, Direction::PlaneBehind]
            .into_iter()
            .collect();
        let feasible: DirectionSet = [Direction::OrbitNext, Direction::OrbitPrev]
            .into_iter()
            .collect();
        let key = MaskKey::new(approach, feasible);
        assert_eq!(key.as_str(), "3210");
        assert_eq!(key.digits(), [3, 2, 1, 0]);
    }

    #[test]
    fn test_identical_masks_share_key() {
        let a: DirectionSet = [Direction::PlaneAhead].into_iter().collect();
        assert_eq!(MaskKey::new(a, a), MaskKey::new(a, a));
        assert_ne!(MaskKey::new(a, a), MaskKey::new(a, DirectionSet::EMPTY));
    }
}
