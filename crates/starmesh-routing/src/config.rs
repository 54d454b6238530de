//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reward::RewardParams;

/// Per-engine tunables. Periods are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decision epoch: cache time-to-live and gossip cadence driver
    pub gather_period_ms: u64,
    /// Delay before the first link-state broadcast
    pub first_broadcast_ms: u64,
    /// Period of the queue-occupancy average reset
    pub queue_reset_ms: u64,
    /// Period of the packet counter snapshot
    pub counter_period_ms: u64,
    pub reward: RewardParams,
    /// Seed for the sampling RNG; mixed with the node id
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gather_period_ms: 100,
            first_broadcast_ms: 1,
            queue_reset_ms: 1_000,
            counter_period_ms: 1_000,
            reward: RewardParams::default(),
            seed: 0,
        }
    }
}

impl EngineConfig {
    pub fn gather_period(&self) -> Duration {
        Duration::from_millis(self.gather_period_ms)
    }

    /// Gossip runs twice per decision epoch
    pub fn broadcast_period(&self) -> Duration {
        self.gather_period() / 2
    }

    pub fn first_broadcast(&self) -> Duration {
        Duration::from_millis(self.first_broadcast_ms)
    }

    pub fn queue_reset_period(&self) -> Duration {
        Duration::from_millis(self.queue_reset_ms)
    }

    pub fn counter_period(&self) -> Duration {
        Duration::from_millis(self.counter_period_ms)
    }

    /// Set the decision epoch
    pub fn with_gather_period(mut self, period: Duration) -> Self {
        self.gather_period_ms = period.as_millis() as u64;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
