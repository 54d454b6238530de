//! Error types for the simulation driver

use starmesh_core::{NodeId, TopologyError, WireError};
use starmesh_routing::RoutingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("no engine installed on {0}")]
    MissingEngine(NodeId),

    #[error("flow references terminal index {index}, only {available} terminals exist")]
    UnknownTerminal { index: u32, available: u32 },

    #[error("scenario needs at least two ground terminals, found {0}")]
    NotEnoughTerminals(u32),
}

pub type SimResult<T> = Result<T, SimError>;
