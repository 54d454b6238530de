//! Constellation topology
//!
//! Builds the +Grid torus of inter-satellite links, attaches ground terminals
//! and derives the shortest-path forwarding tables every engine is installed
//! with.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use starmesh_core::{ConstellationGeometry, NodeId};
use starmesh_routing::{GroundAttachments, StaticRoutingTable};

/// A constellation ready to have engines installed on it
#[derive(Debug, Clone)]
pub struct Constellation {
    pub geometry: ConstellationGeometry,
    /// Undirected inter-satellite links
    pub edges: Vec<(NodeId, NodeId)>,
    /// Ground terminal -> serving satellite
    pub ground: Arc<GroundAttachments>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Constellation {
    pub fn satellites(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.geometry.satellite_count()).map(NodeId)
    }

    pub fn terminals(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ground.keys().copied()
    }

    pub fn satellite_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency.get(&a).is_some_and(|n| n.contains(&b))
    }

    /// Hop counts from `source` to every satellite
    pub fn hop_distances(&self, source: NodeId) -> BTreeMap<NodeId, u32> {
        let mut distances = BTreeMap::from([(source, 0)]);
        let mut frontier = VecDeque::from([source]);
        while let Some(node) = frontier.pop_front() {
            let hops = distances[&node];
            for next in self.neighbors(node) {
                if !distances.contains_key(&next) {
                    distances.insert(next, hops + 1);
                    frontier.push_back(next);
                }
            }
        }
        distances
    }

    /// Shortest-path next hops for every satellite.
    ///
    /// For each destination the candidate list holds every neighbor that is
    /// one hop closer, in ascending id order.
    pub fn static_tables(&self) -> BTreeMap<NodeId, StaticRoutingTable> {
        let from_destination: BTreeMap<NodeId, BTreeMap<NodeId, u32>> = self
            .satellites()
            .map(|dest| (dest, self.hop_distances(dest)))
            .collect();

        self.satellites()
            .map(|node| {
                let mut routes = BTreeMap::new();
                for (dest, distances) in &from_destination {
                    if *dest == node {
                        continue;
                    }
                    let Some(&here) = distances.get(&node) else {
                        continue;
                    };
                    let hops: Vec<NodeId> = self
                        .neighbors(node)
                        .filter(|n| distances.get(n).is_some_and(|d| *d + 1 == here))
                        .collect();
                    routes.insert(*dest, hops);
                }
                (node, StaticRoutingTable::new(node, routes))
            })
            .collect()
    }

    /// Print a simple ASCII visualization of the plane/phase grid
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Constellation Topology:\n");
        output.push_str(&format!(
            "  Orbits: {}  Satellites per orbit: {}\n",
            self.geometry.num_orbits, self.geometry.sats_per_orbit
        ));
        output.push_str(&format!("  Satellites: {}\n", self.satellite_count()));
        output.push_str(&format!("  Links: {}\n", self.edge_count()));
        output.push_str(&format!("  Ground terminals: {}\n\n", self.ground.len()));

        for orbit in 0..self.geometry.num_orbits {
            let row: Vec<String> = (0..self.geometry.sats_per_orbit)
                .map(|phase| {
                    let sat = self.geometry.satellite_at(orbit, phase);
                    let marker = if self.ground.values().any(|s| *s == sat) { "*" } else { "" };
                    format!("{:>4}{:<1}", sat.to_string(), marker)
                })
                .collect();
            output.push_str(&format!("  orbit {:>2}: {}\n", orbit, row.join(" -")));
        }
        output.push_str("\n  * serves a ground terminal\n");
        output
    }
}

/// Builder for constellation topologies
pub struct ConstellationBuilder {
    geometry: ConstellationGeometry,
    ground_terminals: u32,
}

impl ConstellationBuilder {
    pub fn new(num_orbits: u32, sats_per_orbit: u32) -> Self {
        Self {
            geometry: ConstellationGeometry::new(num_orbits, sats_per_orbit),
            ground_terminals: 0,
        }
    }

    pub fn with_ground_terminals(mut self, count: u32) -> Self {
        self.ground_terminals = count;
        self
    }

    /// Build the +Grid torus: every satellite links to the next in its plane
    /// and to the same phase in the next plane.
    ///
    /// Terminals take the ids after the last satellite and are spread evenly
    /// over the constellation.
    pub fn torus(self) -> Constellation {
        let geo = self.geometry;
        let mut edges = Vec::new();
        let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

        for orbit in 0..geo.num_orbits {
            for phase in 0..geo.sats_per_orbit {
                let me = geo.satellite_at(orbit, phase);
                adjacency.entry(me).or_default();
                for other in [geo.satellite_at(orbit, phase + 1), geo.satellite_at(orbit + 1, phase)] {
                    if other == me || adjacency.get(&me).is_some_and(|n| n.contains(&other)) {
                        continue;
                    }
                    edges.push((me, other));
                    adjacency.entry(me).or_default().insert(other);
                    adjacency.entry(other).or_default().insert(me);
                }
            }
        }

        let satellites = geo.satellite_count();
        let stride = if self.ground_terminals == 0 {
            1
        } else {
            (satellites / self.ground_terminals).max(1)
        };
        let ground: GroundAttachments = (0..self.ground_terminals)
            .map(|k| {
                let serving = NodeId((k * stride + k / satellites.max(1)) % satellites.max(1));
                (NodeId(satellites + k), serving)
            })
            .collect();

        Constellation {
            geometry: geo,
            edges,
            ground: Arc::new(ground),
            adjacency,
        }
    }
}
