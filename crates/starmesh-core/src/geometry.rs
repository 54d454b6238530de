//! Orbit/phase arithmetic for a torus constellation
//!
//! Satellites are numbered orbit-major: satellite `id` sits in orbit
//! `id / sats_per_orbit` at phase `id % sats_per_orbit`. Ids at or beyond
//! `num_orbits * sats_per_orbit` belong to ground terminals.

use serde::{Deserialize, Serialize};

use crate::identity::NodeId;

/// Shape of the constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstellationGeometry {
    pub num_orbits: u32,
    pub sats_per_orbit: u32,
}

impl ConstellationGeometry {
    pub fn new(num_orbits: u32, sats_per_orbit: u32) -> Self {
        Self {
            num_orbits,
            sats_per_orbit,
        }
    }

    pub fn satellite_count(&self) -> u32 {
        self.num_orbits * self.sats_per_orbit
    }

    pub fn is_satellite(&self, node: NodeId) -> bool {
        node.0 < self.satellite_count()
    }

    pub fn orbit_of(&self, node: NodeId) -> u32 {
        node.0 / self.sats_per_orbit
    }

    pub fn phase_of(&self, node: NodeId) -> u32 {
        node.0 % self.sats_per_orbit
    }

    /// Satellite at the given orbit and phase, both taken modulo the shape
    pub fn satellite_at(&self, orbit: u32, phase: u32) -> NodeId {
        NodeId((orbit % self.num_orbits) * self.sats_per_orbit + phase % self.sats_per_orbit)
    }

    /// Minimum hop count between two satellites on the torus
    pub fn remaining_hops(&self, from: NodeId, to: NodeId) -> u32 {
        let d_orbit = self.orbit_of(from).abs_diff(self.orbit_of(to));
        let d_phase = self.phase_of(from).abs_diff(self.phase_of(to));
        d_orbit.min(self.num_orbits - d_orbit) + d_phase.min(self.sats_per_orbit - d_phase)
    }
}
