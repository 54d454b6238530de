//! Link-state gossip between adjacent satellites
//!
//! Every half decision epoch each satellite composes a [`FeatureVector`]
//! describing itself and its four links and sends it to each neighbor over
//! a dedicated point-to-point channel. Receivers keep only the most recent
//! vector per direction slot; these snapshots become the second-order part
//! of the policy's observation.
//!
//! ## Wire format
//!
//! An 8-byte [`GossipTag`] followed by the postcard-encoded feature vector.

use bytes::{BufMut, Bytes, BytesMut};
use starmesh_core::{
    Direction, FeatureVector, GeoPosition, GossipTag, LinkSnapshot, TrafficCounters, WireError,
};

/// Normalization for relative speed, km/s
const SPEED_SCALE: f64 = 280.0;
/// Normalization for data rate, bps
const RATE_SCALE: f64 = 1e7;

/// One link-state broadcast, addressed to a single neighbor
#[derive(Debug, Clone, PartialEq)]
pub struct GossipMessage {
    pub tag: GossipTag,
    pub features: FeatureVector,
}

impl GossipMessage {
    pub fn encode(&self) -> Result<Bytes, WireError> {
        let payload = postcard::to_allocvec(&self.features)?;
        let mut buf = BytesMut::with_capacity(GossipTag::WIRE_SIZE + payload.len());
        self.tag.encode_into(&mut buf);
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut buf = bytes;
        let tag = GossipTag::decode_from(&mut buf)?;
        let features = postcard::from_bytes(buf)?;
        Ok(Self { tag, features })
    }
}

/// Most recent vector received from each neighbor slot
#[derive(Debug, Clone, Default)]
pub struct NeighborSnapshots {
    slots: [Option<FeatureVector>; 4],
}

impl NeighborSnapshots {
    /// Overwrite the snapshot for `direction`
    pub fn store(&mut self, direction: Direction, features: FeatureVector) {
        self.slots[direction.index()] = Some(features);
    }

    pub fn get(&self, direction: Direction) -> Option<&FeatureVector> {
        self.slots[direction.index()].as_ref()
    }

    pub fn all(&self) -> [Option<FeatureVector>; 4] {
        self.slots.clone()
    }
}

/// Running mean of per-direction queue occupancy, sampled at each decision
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueOccupancy {
    ratio_sum: [f64; 4],
    samples: u32,
}

impl QueueOccupancy {
    pub fn sample(&mut self, links: &[LinkSnapshot; 4]) {
        for (sum, link) in self.ratio_sum.iter_mut().zip(links) {
            *sum += link.queue_ratio();
        }
        self.samples += 1;
    }

    /// `1 - mean occupancy` per direction, zero before any sample
    pub fn idle_ratio(&self) -> [f64; 4] {
        if self.samples == 0 {
            return [0.0; 4];
        }
        self.ratio_sum.map(|sum| 1.0 - sum / self.samples as f64)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}

/// Inputs gathered by the engine when composing its own vector
#[derive(Debug, Clone)]
pub struct FeatureInputs<'a> {
    /// Self then the four neighbors, in slot order
    pub positions: [GeoPosition; 5],
    /// Live link state per direction
    pub links: &'a [LinkSnapshot; 4],
    /// Distance and relative speed from the last recomputation
    pub geometry: &'a [(f64, f64); 4],
    pub occupancy: &'a QueueOccupancy,
    /// Packet counts over the last counter period
    pub period_traffic: &'a TrafficCounters,
    pub neighbors: &'a NeighborSnapshots,
    pub busyness: [f64; 4],
}

pub fn compose_features(inputs: &FeatureInputs<'_>) -> FeatureVector {
    let mut fv = FeatureVector::default();

    for (slot, pos) in fv.positions.iter_mut().zip(inputs.positions) {
        *slot = [pos.latitude_deg / 90.0, pos.longitude_deg / 180.0];
    }

    for direction in Direction::ALL {
        let i = direction.index();
        let link = &inputs.links[i];
        fv.data_rate[i] = if link.is_up() {
            link.data_rate_bps / RATE_SCALE
        } else {
            0.0
        };
        fv.distance[i] = inputs.geometry[i].0;
        fv.relative_speed[i] = inputs.geometry[i].1 / SPEED_SCALE;
        fv.isl_sent[i] = inputs.period_traffic.isl_sent[i] as f64;
        fv.isl_received[i] = inputs.period_traffic.isl_received[i] as f64;
        fv.queue_ratio[i] = link.queue_ratio();
        fv.decay[i] = link.decay_factor;

        let neighbor = inputs.neighbors.get(direction);
        fv.ground_sent[i + 1] = neighbor.map_or(0.0, FeatureVector::own_ground_sent);
        fv.ground_received[i + 1] = neighbor.map_or(0.0, FeatureVector::own_ground_received);
    }

    fv.idle_ratio = inputs.occupancy.idle_ratio();
    fv.ground_sent[0] = inputs.period_traffic.ground_sent as f64;
    fv.ground_received[0] = inputs.period_traffic.ground_received as f64;
    fv.busyness = inputs.busyness;
    fv
}

#[cfg(test)]
mod tests {
    use super::*;
    use starmesh_core::{LinkState, NodeId};

    #[test]
    fn test_message_wire_format() {
        let msg = GossipMessage {
            tag: GossipTag::new(NodeId(4), NodeId(9)),
            features: FeatureVector {
                busyness: [0.5, 0.0, 1.5, 0.0],
                ..Default::default()
            },
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(&bytes[0..4], &4u32.to_be_bytes());
        assert_eq!(&bytes[4..8], &9u32.to_be_bytes());
        assert_eq!(GossipMessage::decode(&bytes).unwrap(), msg);
        assert!(GossipMessage::decode(&bytes[..6]).is_err());
    }

    #[test]
    fn test_snapshot_overwrites() {
        let mut snaps = NeighborSnapshots::default();
        let mut fv = FeatureVector::default();
        fv.decay[0] = 0.3;
        snaps.store(Direction::PlaneBehind, fv.clone());
        fv.decay[0] = 0.7;
        snaps.store(Direction::PlaneBehind, fv);
        assert_eq!(snaps.get(Direction::PlaneBehind).unwrap().decay[0], 0.7);
        assert!(snaps.get(Direction::OrbitNext).is_none());
    }

    #[test]
    fn test_idle_ratio() {
        let mut occ = QueueOccupancy::default();
        assert_eq!(occ.idle_ratio(), [0.0; 4]);
        let mut links = [LinkSnapshot {
            max_queue: 10,
            ..Default::default()
        }; 4];
        links[0].queue_len = 5;
        occ.sample(&links);
        links[0].queue_len = 0;
        occ.sample(&links);
        assert_eq!(occ.idle_ratio(), [0.75, 1.0, 1.0, 1.0]);
        occ.reset();
        assert_eq!(occ.samples(), 0);
    }

    #[test]
    fn test_compose_features() {
        let mut links = [LinkSnapshot {
            data_rate_bps: 2e7,
            decay_factor: 0.9,
            ..Default::default()
        }; 4];
        links[2].state = LinkState::Down;
        let geometry = [(1000.0, 28.0); 4];
        let occupancy = QueueOccupancy::default();
        let traffic = TrafficCounters {
            isl_sent: [1, 2, 3, 4],
            ground_sent: 7,
            ..Default::default()
        };
        let mut neighbors = NeighborSnapshots::default();
        let mut from_next = FeatureVector::default();
        from_next.ground_sent[0] = 11.0;
        neighbors.store(Direction::OrbitNext, from_next);

        let mut positions = [GeoPosition::default(); 5];
        positions[0] = GeoPosition {
            latitude_deg: 45.0,
            longitude_deg: -90.0,
        };

        let fv = compose_features(&FeatureInputs {
            positions,
            links: &links,
            geometry: &geometry,
            occupancy: &occupancy,
            period_traffic: &traffic,
            neighbors: &neighbors,
            busyness: [0.5; 4],
        });
        assert_eq!(fv.positions[0], [0.5, -0.5]);
        assert_eq!(fv.data_rate, [2.0, 2.0, 0.0, 2.0]);
        assert_eq!(fv.relative_speed, [0.1; 4]);
        assert_eq!(fv.isl_sent, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(fv.ground_sent, [7.0, 11.0, 0.0, 0.0, 0.0]);
        assert_eq!(fv.decay, [0.9; 4]);
    }
}
