//! Link, channel and mobility model
//!
//! Satellites fly circular orbits; every inter-satellite link has a FIFO
//! transmit queue whose service rate is the nominal data rate scaled by a
//! distance-dependent decay factor. Links fail and recover at random and the
//! failure is always symmetric.

use std::f64::consts::{PI, TAU};

use rand::Rng;
use starmesh_core::{
    ConstellationGeometry, ConstellationView, Direction, GeoPosition, LinkSnapshot, LinkState,
    NodeId, SimTime, TrafficCounters,
};
use starmesh_routing::NeighborTable;
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::SimResult;
use crate::topology::Constellation;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const EARTH_MU_KM3_S2: f64 = 398_600.441_8;
const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;
const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
/// Links longer than this have no usable capacity left
const MAX_LINK_RANGE_KM: f64 = 8_000.0;
const MIN_DECAY: f64 = 0.05;

/// Why a packet could not be put on a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    LinkDown,
    QueueFull,
}

/// A link changed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFlip {
    pub node: NodeId,
    pub direction: Direction,
    pub state: LinkState,
}

#[derive(Debug, Clone)]
struct LinkRuntime {
    peer: NodeId,
    state: LinkState,
    queue_len: u32,
    busy_until: SimTime,
    distance_km: f64,
    relative_speed: f64,
    decay_factor: f64,
}

/// Mutable physical state of the whole constellation
#[derive(Debug)]
pub struct LinkModel {
    geometry: ConstellationGeometry,
    config: LinkConfig,
    links: Vec<[LinkRuntime; 4]>,
    positions: Vec<GeoPosition>,
    traffic: Vec<TrafficCounters>,
    last_update: SimTime,
}

impl LinkModel {
    pub fn new(constellation: &Constellation, config: LinkConfig) -> SimResult<Self> {
        let geometry = constellation.geometry;
        let mut links = Vec::with_capacity(constellation.satellite_count());
        for sat in constellation.satellites() {
            let table = NeighborTable::from_edges(sat, &geometry, &constellation.edges)?;
            links.push(Direction::ALL.map(|d| LinkRuntime {
                peer: table.neighbor(d),
                state: LinkState::Up,
                queue_len: 0,
                busy_until: SimTime::ZERO,
                distance_km: 0.0,
                relative_speed: 0.0,
                decay_factor: 1.0,
            }));
        }

        let count = links.len();
        let mut model = Self {
            geometry,
            config,
            links,
            positions: vec![GeoPosition::default(); count],
            traffic: vec![TrafficCounters::default(); count],
            last_update: SimTime::ZERO,
        };
        model.update_geometry(SimTime::ZERO);
        Ok(model)
    }

    fn orbit_radius_km(&self) -> f64 {
        EARTH_RADIUS_KM + self.config.altitude_km
    }

    fn angular_rate(&self) -> f64 {
        let r = self.orbit_radius_km();
        (EARTH_MU_KM3_S2 / (r * r * r)).sqrt()
    }

    /// Earth-centered inertial position of a satellite at `now`
    fn cartesian(&self, sat: NodeId, now: SimTime) -> [f64; 3] {
        let geo = self.geometry;
        let r = self.orbit_radius_km();
        let raan = TAU * geo.orbit_of(sat) as f64 / geo.num_orbits as f64;
        let u = TAU * geo.phase_of(sat) as f64 / geo.sats_per_orbit as f64
            + self.angular_rate() * now.as_micros() as f64 / 1e6;
        let inc = self.config.inclination_deg * PI / 180.0;
        [
            r * (raan.cos() * u.cos() - raan.sin() * u.sin() * inc.cos()),
            r * (raan.sin() * u.cos() + raan.cos() * u.sin() * inc.cos()),
            r * u.sin() * inc.sin(),
        ]
    }

    /// Move every satellite to its position at `now` and refresh link lengths
    pub fn update_geometry(&mut self, now: SimTime) {
        let xyz: Vec<[f64; 3]> = (0..self.links.len() as u32)
            .map(|s| self.cartesian(NodeId(s), now))
            .collect();
        let elapsed = now.since(self.last_update).as_secs_f64();
        let earth_angle = EARTH_ROTATION_RAD_S * now.as_micros() as f64 / 1e6;

        for (sat, [x, y, z]) in xyz.iter().enumerate() {
            let r = (x * x + y * y + z * z).sqrt();
            let longitude = (y.atan2(*x) - earth_angle + PI).rem_euclid(TAU) - PI;
            self.positions[sat] = GeoPosition {
                latitude_deg: (z / r).asin() * 180.0 / PI,
                longitude_deg: longitude * 180.0 / PI,
            };
        }

        for (sat, links) in self.links.iter_mut().enumerate() {
            for link in links.iter_mut() {
                let [ax, ay, az] = xyz[sat];
                let [bx, by, bz] = xyz[link.peer.0 as usize];
                let distance = ((ax - bx).powi(2) + (ay - by).powi(2) + (az - bz).powi(2)).sqrt();
                link.relative_speed = if elapsed > 0.0 {
                    (distance - link.distance_km).abs() / elapsed
                } else {
                    0.0
                };
                link.distance_km = distance;
                link.decay_factor = (1.0 - distance / MAX_LINK_RANGE_KM).clamp(MIN_DECAY, 1.0);
            }
        }
        self.last_update = now;
    }

    /// Roll failures and repairs for one update period.
    ///
    /// Each physical link is drawn once and both ends flip together.
    pub fn inject_faults(&mut self, rng: &mut impl Rng) -> Vec<LinkFlip> {
        let dt = self.config.update_period().as_secs_f64();
        let p_fail = (1.0 - (-self.config.failure_rate * dt).exp()).clamp(0.0, 1.0);
        let p_repair = (1.0 - (-self.config.repair_rate * dt).exp()).clamp(0.0, 1.0);

        let mut flips = Vec::new();
        for sat in 0..self.links.len() {
            for direction in [Direction::OrbitNext, Direction::PlaneAhead] {
                let link = &self.links[sat][direction.index()];
                let next = match link.state {
                    LinkState::Up if rng.random_bool(p_fail) => LinkState::Down,
                    LinkState::Down if rng.random_bool(p_repair) => LinkState::Up,
                    _ => continue,
                };
                let peer = link.peer;
                self.links[sat][direction.index()].state = next;
                self.links[peer.0 as usize][direction.opposite().index()].state = next;
                debug!(node = sat, peer = %peer, ?next, "link flipped");
                flips.push(LinkFlip {
                    node: NodeId(sat as u32),
                    direction,
                    state: next,
                });
                flips.push(LinkFlip {
                    node: peer,
                    direction: direction.opposite(),
                    state: next,
                });
            }
        }
        flips
    }

    /// Force a link (both ends) into `state`
    pub fn set_state(&mut self, node: NodeId, direction: Direction, state: LinkState) -> Vec<LinkFlip> {
        let Some(link) = self.runtime_mut(node, direction) else {
            return Vec::new();
        };
        link.state = state;
        let peer = link.peer;
        if let Some(back) = self.runtime_mut(peer, direction.opposite()) {
            back.state = state;
        }
        vec![
            LinkFlip { node, direction, state },
            LinkFlip {
                node: peer,
                direction: direction.opposite(),
                state,
            },
        ]
    }

    fn runtime(&self, node: NodeId, direction: Direction) -> Option<&LinkRuntime> {
        self.links.get(node.0 as usize).map(|l| &l[direction.index()])
    }

    fn runtime_mut(&mut self, node: NodeId, direction: Direction) -> Option<&mut LinkRuntime> {
        self.links.get_mut(node.0 as usize).map(|l| &mut l[direction.index()])
    }

    pub fn link_state(&self, node: NodeId, direction: Direction) -> LinkState {
        self.runtime(node, direction).map_or(LinkState::Down, |l| l.state)
    }

    pub fn peer(&self, node: NodeId, direction: Direction) -> Option<NodeId> {
        self.runtime(node, direction).map(|l| l.peer)
    }

    /// Enqueue a packet of `size_bytes` and return the time it finishes
    /// serializing onto the link.
    pub fn enqueue(
        &mut self,
        now: SimTime,
        node: NodeId,
        direction: Direction,
        size_bytes: u32,
    ) -> Result<SimTime, TransmitError> {
        let data_rate = self.config.data_rate_bps;
        let max_queue = self.config.max_queue;
        let link = self
            .runtime_mut(node, direction)
            .ok_or(TransmitError::LinkDown)?;
        if link.state == LinkState::Down {
            return Err(TransmitError::LinkDown);
        }
        if link.queue_len >= max_queue {
            return Err(TransmitError::QueueFull);
        }

        let rate = (data_rate * link.decay_factor).max(1.0);
        let serialization = f64::from(size_bytes) * 8.0 / rate;
        let start = link.busy_until.max(now);
        let done = start + std::time::Duration::from_secs_f64(serialization);
        link.queue_len += 1;
        link.busy_until = done;
        Ok(done)
    }

    /// A packet finished serializing. Returns the peer and the propagation
    /// delay if the link survived, or `LinkDown` if it failed meanwhile.
    pub fn dequeue(
        &mut self,
        node: NodeId,
        direction: Direction,
    ) -> Result<(NodeId, std::time::Duration), TransmitError> {
        let link = self
            .runtime_mut(node, direction)
            .ok_or(TransmitError::LinkDown)?;
        link.queue_len = link.queue_len.saturating_sub(1);
        if link.state == LinkState::Down {
            return Err(TransmitError::LinkDown);
        }
        let peer = link.peer;
        let delay = self.propagation(node, direction);
        if let Some(counters) = self.traffic.get_mut(node.0 as usize) {
            counters.isl_sent[direction.index()] += 1;
        }
        Ok((peer, delay))
    }

    /// One-way light time over a link
    pub fn propagation(&self, node: NodeId, direction: Direction) -> std::time::Duration {
        let distance = self.runtime(node, direction).map_or(0.0, |l| l.distance_km);
        std::time::Duration::from_secs_f64(distance / SPEED_OF_LIGHT_KM_S)
    }

    /// One-way light time between a satellite and the ground
    pub fn ground_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.config.altitude_km / SPEED_OF_LIGHT_KM_S)
    }

    /// Count a packet arriving over an inter-satellite link; `direction` is
    /// the arrival direction at `node`
    pub fn record_isl_arrival(&mut self, node: NodeId, direction: Direction) {
        if let Some(counters) = self.traffic.get_mut(node.0 as usize) {
            counters.isl_received[direction.index()] += 1;
        }
    }

    pub fn record_uplink(&mut self, node: NodeId) {
        if let Some(counters) = self.traffic.get_mut(node.0 as usize) {
            counters.ground_received += 1;
        }
    }

    pub fn record_downlink(&mut self, node: NodeId) {
        if let Some(counters) = self.traffic.get_mut(node.0 as usize) {
            counters.ground_sent += 1;
        }
    }

    pub fn links_down(&self) -> usize {
        self.links
            .iter()
            .flatten()
            .filter(|l| l.state == LinkState::Down)
            .count()
            / 2
    }
}

impl ConstellationView for LinkModel {
    fn link(&self, node: NodeId, direction: Direction) -> LinkSnapshot {
        match self.runtime(node, direction) {
            Some(link) => LinkSnapshot {
                state: link.state,
                queue_len: link.queue_len,
                max_queue: self.config.max_queue,
                distance_km: link.distance_km,
                decay_factor: link.decay_factor,
                data_rate_bps: self.config.data_rate_bps,
                relative_speed: link.relative_speed,
            },
            None => LinkSnapshot {
                state: LinkState::Down,
                ..Default::default()
            },
        }
    }

    fn position(&self, node: NodeId) -> GeoPosition {
        self.positions.get(node.0 as usize).copied().unwrap_or_default()
    }

    fn traffic(&self, node: NodeId) -> TrafficCounters {
        self.traffic.get(node.0 as usize).copied().unwrap_or_default()
    }
}
