//! Error types for starmesh

use thiserror::Error;

use crate::identity::NodeId;

/// Configuration invariant violations detected while wiring a node
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("satellite {node} didn't record neighbor satellite interfaces correctly: found {found} incident links, expected 4")]
    NeighborCount { node: NodeId, found: usize },

    #[error("satellite {node} has a link to {other} that fits no direction slot")]
    UnclassifiedLink { node: NodeId, other: NodeId },

    #[error("satellite {node} resolved two neighbors into slot {slot}")]
    DuplicateSlot { node: NodeId, slot: usize },

    #[error("satellite {node} chose next hop {next_hop}, which is not a neighbor")]
    NextHopNotNeighbor { node: NodeId, next_hop: NodeId },

    #[error("satellite {node} has no static route to {destination}")]
    NoRoute { node: NodeId, destination: NodeId },

    #[error("ground terminal {0} is not attached to any satellite")]
    UnattachedTerminal(NodeId),

    #[error("node {0} is not part of the constellation")]
    UnknownNode(NodeId),
}

/// Errors decoding fixed-layout wire records
#[derive(Debug, Error)]
pub enum WireError {
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{0} trailing bytes after record")]
    Trailing(usize),

    #[error("payload encoding error: {0}")]
    Payload(#[from] postcard::Error),
}

/// Errors reported by a policy oracle
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy is not initialized yet")]
    NotReady,

    #[error("policy query failed: {0}")]
    QueryFailed(String),

    #[error("policy returned an invalid probability vector: {0:?}")]
    InvalidProbabilities([f64; 4]),
}
