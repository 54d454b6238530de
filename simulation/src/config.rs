//! Scenario configuration
//!
//! Everything a run needs is in [`SimConfig`]; it deserializes from JSON with
//! every field optional.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use starmesh_routing::{EngineConfig, Strategy};

use crate::policy::PolicyKind;

/// Configuration for a constellation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of orbital planes
    pub num_orbits: u32,
    /// Satellites per plane
    pub sats_per_orbit: u32,
    /// Ground terminals attached to the constellation
    pub ground_terminals: u32,
    /// Simulated duration in milliseconds
    pub duration_ms: u64,
    /// Strategy installed on every satellite
    pub strategy: Strategy,
    /// Scripted oracle answering policy queries
    pub policy: PolicyConfig,
    pub links: LinkConfig,
    pub traffic: TrafficConfig,
    pub engine: EngineConfig,
    /// Packets still in flight after this many hops are discarded
    pub max_hops: u32,
    /// Seed for traffic, fault injection and every engine
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_orbits: 6,
            sats_per_orbit: 11,
            ground_terminals: 12,
            duration_ms: 2_000,
            strategy: Strategy::AdaptivePolicy,
            policy: PolicyConfig::default(),
            links: LinkConfig::default(),
            traffic: TrafficConfig::default(),
            engine: EngineConfig::default(),
            max_hops: 64,
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Load a scenario from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.engine.seed = seed;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// A small, quiet constellation for tests and smoke runs
    pub fn small() -> Self {
        Self {
            num_orbits: 4,
            sats_per_orbit: 6,
            ground_terminals: 6,
            duration_ms: 500,
            ..Default::default()
        }
    }
}

/// Scripted oracle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    /// Whether the oracle asks for rewards
    pub training: bool,
    /// The oracle reports not-ready until this simulated time
    pub warmup_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::QueueAware,
            training: true,
            warmup_ms: 0,
        }
    }
}

/// Physical link model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub data_rate_bps: f64,
    pub max_queue: u32,
    pub altitude_km: f64,
    pub inclination_deg: f64,
    /// Probability per second that an up link fails
    pub failure_rate: f64,
    /// Probability per second that a failed link recovers
    pub repair_rate: f64,
    /// How often link state, geometry and faults are re-evaluated
    pub update_period_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            data_rate_bps: 10_000_000.0,
            max_queue: 100,
            altitude_km: 550.0,
            inclination_deg: 53.0,
            failure_rate: 0.05,
            repair_rate: 2.0,
            update_period_ms: 50,
        }
    }
}

impl LinkConfig {
    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms.max(1))
    }
}

/// Ground traffic between terminal pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Number of terminal-to-terminal flows
    pub flows: u32,
    /// Mean packet rate of each flow
    pub packets_per_second: f64,
    pub packet_size_bytes: u32,
    /// Explicit (source, destination) terminal indices. When set, replaces
    /// the randomly drawn flows.
    pub pairs: Vec<(u32, u32)>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            flows: 8,
            packets_per_second: 400.0,
            packet_size_bytes: 1_500,
            pairs: Vec::new(),
        }
    }
}
