//! Error types for the forwarding engine

use starmesh_core::{NodeId, PolicyError, TopologyError, WireError};
use thiserror::Error;

/// Errors raised by a decision engine
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("satellite {node} has no reward accumulator for mask {mask}")]
    UnknownMask { node: NodeId, mask: String },

    #[error("satellite {0} has not recorded its interfaces yet")]
    NotInstalled(NodeId),

    #[error("satellite {0} uses the adaptive strategy but has no policy")]
    MissingPolicy(NodeId),
}

/// Result type alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
