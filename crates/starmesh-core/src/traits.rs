//! Collaborator traits consumed by the forwarding engine

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::features::FeatureVector;
use crate::identity::{Direction, NodeId};
use crate::link::{GeoPosition, LinkSnapshot, TrafficCounters};

/// Read-only view of the link/channel and mobility collaborators
pub trait ConstellationView {
    /// Current state of the link leaving `node` in `direction`
    fn link(&self, node: NodeId, direction: Direction) -> LinkSnapshot;

    /// Current sub-satellite point of `node`
    fn position(&self, node: NodeId) -> GeoPosition;

    /// Cumulative packet counters of `node`
    fn traffic(&self, node: NodeId) -> TrafficCounters;
}

/// Everything a policy sees when asked to break a tie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub node: NodeId,
    /// Averaged reward earned by the previous response for this mask
    pub reward: f64,
    pub neighbors: [NodeId; 4],
    /// Per-direction mask digits (approach + 2 x feasible)
    pub mask: [u8; 4],
    pub own: FeatureVector,
    /// Latest gossip received from each neighbor slot
    pub neighbor_features: [Option<FeatureVector>; 4],
}

/// External learned policy reached through an observe/act round trip.
///
/// Queries are synchronous: the simulation clock does not advance while
/// one is outstanding.
pub trait PolicyOracle: Send + Sync {
    /// Whether the policy can answer queries yet
    fn is_ready(&self) -> bool;

    /// Whether decisions should produce training feedback
    fn is_training(&self) -> bool;

    /// Report the reward for the previous response and get a probability
    /// vector over the four directions
    fn query(&self, observation: &Observation) -> Result<[f64; 4], PolicyError>;
}
