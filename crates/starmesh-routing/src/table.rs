//! Static shortest-path routing table
//!
//! The [`StaticRoutingTable`] maps each destination satellite to the
//! neighbors lying on a precomputed shortest path toward it. Several
//! neighbors may tie. The table is built once after topology stabilizes and
//! never mutated.

use std::collections::BTreeMap;
use std::fmt;

use starmesh_core::{NodeId, TopologyError};

#[derive(Debug, Clone)]
pub struct StaticRoutingTable {
    node: NodeId,
    /// Candidate next hops per destination, in precomputed order
    routes: BTreeMap<NodeId, Vec<NodeId>>,
}

impl StaticRoutingTable {
    pub fn new(node: NodeId, routes: BTreeMap<NodeId, Vec<NodeId>>) -> Self {
        Self { node, routes }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Equally-optimal next hops toward `destination`
    pub fn candidates(&self, destination: NodeId) -> Option<&[NodeId]> {
        self.routes
            .get(&destination)
            .map(Vec::as_slice)
            .filter(|c| !c.is_empty())
    }

    /// First listed next hop, used when the table is read directly
    pub fn first_candidate(&self, destination: NodeId) -> Result<NodeId, TopologyError> {
        self.candidates(destination)
            .and_then(|c| c.first().copied())
            .ok_or(TopologyError::NoRoute {
                node: self.node,
                destination,
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Display for StaticRoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State of RL Router: {}", self.node)?;
        for (dest, hops) in &self.routes {
            let hops: Vec<String> = hops.iter().map(ToString::to_string).collect();
            writeln!(f, "  -> {}: {{{}}}", dest, hops.join(","))?;
        }
        Ok(())
    }
}
