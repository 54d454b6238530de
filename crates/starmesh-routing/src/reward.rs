//! Reward computation and per-mask reward bookkeeping
//!
//! ## Reward formula
//!
//! For an approaching outcome, each of the two measured inter-hop intervals
//! contributes `(max_delay - interval) / (max_delay - min_delay)`, or zero
//! when the interval is at least `max_delay`. Away and drop outcomes use a
//! fixed penalty instead. The sum is multiplied by a fixed scale.
//!
//! ## Ledger
//!
//! The [`RewardLedger`] keeps, per mask key, the reward summed since the
//! mask's cache entry was last refreshed and how many packets contributed,
//! plus the packets still awaiting feedback for a mask.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use starmesh_core::{DecisionOutcome, PacketId};

use crate::mask::MaskKey;

/// Constants of the reward formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardParams {
    pub max_delay_us: f64,
    pub min_delay_us: f64,
    pub away_penalty: f64,
    pub drop_penalty: f64,
    pub scale: f64,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            max_delay_us: 18_000.0,
            min_delay_us: 2_200.0,
            away_penalty: -1.0,
            drop_penalty: -6.0,
            scale: 0.5,
        }
    }
}

/// Reward earned by a decision given the measured intervals after it
pub fn compute_reward(params: &RewardParams, outcome: DecisionOutcome, intervals: [u32; 2]) -> f64 {
    let raw = match outcome {
        DecisionOutcome::Approaching => {
            let span = params.max_delay_us - params.min_delay_us;
            intervals
                .iter()
                .map(|&i| {
                    let i = i as f64;
                    if i < params.max_delay_us {
                        (params.max_delay_us - i) / span
                    } else {
                        0.0
                    }
                })
                .sum()
        }
        DecisionOutcome::Away => params.away_penalty,
        DecisionOutcome::Drop => params.drop_penalty,
    };
    raw * params.scale
}

/// Reward summed for one mask since its last refresh
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    pub total: f64,
    pub count: u32,
}

impl Accumulator {
    /// Mean reward per attributed packet, zero with no packets
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// What happened to a delivered reward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    /// Added to the accumulator of the given mask
    Applied,
    /// No pending entry for the packet; its feedback window had closed
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct RewardLedger {
    accumulators: BTreeMap<MaskKey, Accumulator>,
    pending: HashMap<PacketId, MaskKey>,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the feedback window of `key`.
    ///
    /// Returns the averaged reward earned since the previous refresh (zero
    /// for a mask never seen), resets the accumulator to zero, and purges
    /// every pending packet recorded against the mask.
    pub fn refresh(&mut self, key: &MaskKey) -> f64 {
        let acc = self.accumulators.entry(key.clone()).or_default();
        let average = acc.average();
        *acc = Accumulator::default();
        self.pending.retain(|_, mask| mask != key);
        average
    }

    /// Averaged reward accumulated for `key`, without closing its window
    pub fn average_reward(&self, key: &MaskKey) -> f64 {
        self.accumulators.get(key).map_or(0.0, Accumulator::average)
    }

    /// Remember that `packet`'s decision used `key` and awaits feedback
    pub fn record_pending(&mut self, packet: PacketId, key: MaskKey) {
        self.pending.insert(packet, key);
    }

    /// Credit `reward` to the mask recorded for `packet`.
    ///
    /// Returns `Ok(Expired)` if nothing is pending for the packet, and the
    /// offending mask as `Err` if a pending entry names a mask with no
    /// accumulator.
    pub fn credit(&mut self, packet: PacketId, reward: f64) -> Result<Credit, MaskKey> {
        let Some(key) = self.pending.remove(&packet) else {
            return Ok(Credit::Expired);
        };
        match self.accumulators.get_mut(&key) {
            Some(acc) => {
                acc.total += reward;
                acc.count += 1;
                Ok(Credit::Applied)
            }
            None => Err(key),
        }
    }

    pub fn accumulator(&self, key: &MaskKey) -> Option<Accumulator> {
        self.accumulators.get(key).copied()
    }

    pub fn pending_mask(&self, packet: PacketId) -> Option<&MaskKey> {
        self.pending.get(&packet)
    }

    /// Pending packets recorded against `key`
    pub fn pending_for(&self, key: &MaskKey) -> usize {
        self.pending.values().filter(|m| *m == key).count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct masks ever refreshed
    pub fn mask_count(&self) -> usize {
        self.accumulators.len()
    }
}
