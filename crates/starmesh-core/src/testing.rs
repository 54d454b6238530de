//! In-memory collaborators for tests
//!
//! Provides a [`ConstellationView`] backed by plain maps and a
//! [`PolicyOracle`] that answers every query with a fixed vector, so engine
//! logic can be exercised without a running simulation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use starmesh_core::testing::{FixedPolicy, MemoryView};
//!
//! let mut view = MemoryView::new();
//! view.set_link(NodeId(0), Direction::OrbitNext, LinkSnapshot::default());
//! let policy = FixedPolicy::new([0.1, 0.2, 0.3, 0.4]);
//! ```

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::PolicyError;
use crate::identity::{Direction, NodeId};
use crate::link::{GeoPosition, LinkSnapshot, LinkState, TrafficCounters};
use crate::traits::{ConstellationView, Observation, PolicyOracle};

/// Map-backed constellation view; unknown links read as default (up, empty queue)
#[derive(Debug, Default, Clone)]
pub struct MemoryView {
    links: HashMap<(NodeId, Direction), LinkSnapshot>,
    positions: HashMap<NodeId, GeoPosition>,
    traffic: HashMap<NodeId, TrafficCounters>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_link(&mut self, node: NodeId, direction: Direction, link: LinkSnapshot) {
        self.links.insert((node, direction), link);
    }

    pub fn set_state(&mut self, node: NodeId, direction: Direction, state: LinkState) {
        self.links.entry((node, direction)).or_default().state = state;
    }

    pub fn link_mut(&mut self, node: NodeId, direction: Direction) -> &mut LinkSnapshot {
        self.links.entry((node, direction)).or_default()
    }

    pub fn set_position(&mut self, node: NodeId, position: GeoPosition) {
        self.positions.insert(node, position);
    }

    pub fn set_traffic(&mut self, node: NodeId, counters: TrafficCounters) {
        self.traffic.insert(node, counters);
    }
}

impl ConstellationView for MemoryView {
    fn link(&self, node: NodeId, direction: Direction) -> LinkSnapshot {
        self.links.get(&(node, direction)).copied().unwrap_or_default()
    }

    fn position(&self, node: NodeId) -> GeoPosition {
        self.positions.get(&node).copied().unwrap_or_default()
    }

    fn traffic(&self, node: NodeId) -> TrafficCounters {
        self.traffic.get(&node).copied().unwrap_or_default()
    }
}

/// Policy that always returns the same probability vector and records what it saw
#[derive(Debug)]
pub struct FixedPolicy {
    probabilities: Mutex<[f64; 4]>,
    ready: bool,
    training: bool,
    failing: Mutex<bool>,
    observations: Mutex<Vec<Observation>>,
}

impl FixedPolicy {
    pub fn new(probabilities: [f64; 4]) -> Self {
        Self {
            probabilities: Mutex::new(probabilities),
            ready: true,
            training: true,
            failing: Mutex::new(false),
            observations: Mutex::new(Vec::new()),
        }
    }

    /// A policy that reports itself as not initialized
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::new([0.25; 4])
        }
    }

    /// Same policy, in inference-only mode
    pub fn inference(mut self) -> Self {
        self.training = false;
        self
    }

    /// Change the vector returned by later queries
    pub fn set_probabilities(&self, probabilities: [f64; 4]) {
        *self.probabilities.lock() = probabilities;
    }

    /// Make later queries fail outright
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn query_count(&self) -> usize {
        self.observations.lock().len()
    }

    /// Rewards reported with each query, in order
    pub fn reported_rewards(&self) -> Vec<f64> {
        self.observations.lock().iter().map(|o| o.reward).collect()
    }

    pub fn last_observation(&self) -> Option<Observation> {
        self.observations.lock().last().cloned()
    }
}

impl PolicyOracle for FixedPolicy {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn query(&self, observation: &Observation) -> Result<[f64; 4], PolicyError> {
        if !self.ready {
            return Err(PolicyError::NotReady);
        }
        if *self.failing.lock() {
            return Err(PolicyError::QueryFailed("scripted failure".into()));
        }
        self.observations.lock().push(observation.clone());
        Ok(*self.probabilities.lock())
    }
}
