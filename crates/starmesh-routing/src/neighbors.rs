//! Four-slot neighbor table
//!
//! Built once from the global inter-satellite link list. Each incident link
//! is classified by the orbit/phase of its far end:
//!
//! - slot 0: next phase in the same orbit (wrapping from the last phase to the first)
//! - slot 1: previous phase in the same orbit (wrapping from the first phase to the last)
//! - slot 2: same phase, previous orbit (wrapping from orbit 0 to the last orbit)
//! - slot 3: same phase, next orbit (wrapping from the last orbit to orbit 0)

use starmesh_core::{ConstellationGeometry, Direction, NodeId, TopologyError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborTable {
    node: NodeId,
    slots: [NodeId; 4],
}

impl NeighborTable {
    /// Classify this node's incident links into direction slots.
    ///
    /// Links with a non-satellite endpoint are ignored. Exactly four
    /// distinct satellite neighbors must be found.
    pub fn from_edges(
        node: NodeId,
        geometry: &ConstellationGeometry,
        edges: &[(NodeId, NodeId)],
    ) -> Result<Self, TopologyError> {
        if !geometry.is_satellite(node) {
            return Err(TopologyError::UnknownNode(node));
        }

        let incident: Vec<NodeId> = edges
            .iter()
            .filter(|(a, b)| geometry.is_satellite(*a) && geometry.is_satellite(*b))
            .filter_map(|&(a, b)| match (a == node, b == node) {
                (true, false) => Some(b),
                (false, true) => Some(a),
                _ => None,
            })
            .collect();

        if incident.len() != 4 {
            return Err(TopologyError::NeighborCount {
                node,
                found: incident.len(),
            });
        }

        let mut slots: [Option<NodeId>; 4] = [None; 4];
        for other in incident {
            let direction = classify(node, other, geometry)
                .ok_or(TopologyError::UnclassifiedLink { node, other })?;
            let slot = &mut slots[direction.index()];
            if slot.is_some() {
                return Err(TopologyError::DuplicateSlot {
                    node,
                    slot: direction.index(),
                });
            }
            *slot = Some(other);
        }

        let mut resolved = [NodeId(0); 4];
        for (i, slot) in slots.into_iter().enumerate() {
            resolved[i] = slot.ok_or(TopologyError::NeighborCount { node, found: i })?;
        }

        debug!(node = %node, neighbors = ?resolved, "neighbor table built");
        Ok(Self {
            node,
            slots: resolved,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn neighbor(&self, direction: Direction) -> NodeId {
        self.slots[direction.index()]
    }

    /// Slot holding `neighbor`, if it is one
    pub fn direction_of(&self, neighbor: NodeId) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| self.slots[d.index()] == neighbor)
    }

    pub fn ids(&self) -> [NodeId; 4] {
        self.slots
    }
}

fn classify(me: NodeId, other: NodeId, geo: &ConstellationGeometry) -> Option<Direction> {
    let spo = geo.sats_per_orbit;
    let (my_orbit, my_phase) = (geo.orbit_of(me), geo.phase_of(me));
    let (their_orbit, their_phase) = (geo.orbit_of(other), geo.phase_of(other));

    if my_orbit == their_orbit {
        if their_phase == (my_phase + 1) % spo {
            return Some(Direction::OrbitNext);
        }
        if their_phase == (my_phase + spo - 1) % spo {
            return Some(Direction::OrbitPrev);
        }
        return None;
    }

    if my_phase != their_phase {
        return None;
    }
    let orbits = geo.num_orbits;
    if their_orbit == (my_orbit + 1) % orbits {
        Some(Direction::PlaneAhead)
    } else if their_orbit == (my_orbit + orbits - 1) % orbits {
        Some(Direction::PlaneBehind)
    } else {
        None
    }
}
