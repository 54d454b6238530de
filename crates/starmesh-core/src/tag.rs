//! Fixed-layout wire records carried alongside packets
//!
//! ## Routing tag
//!
//! Eleven big-endian `u32` fields, 44 bytes:
//!
//! | field        | meaning                                          |
//! |--------------|--------------------------------------------------|
//! | `id`         | packet id                                        |
//! | `hops`       | satellite hops taken so far                      |
//! | `timestamp`  | microsecond clock at the previous hop            |
//! | `intervals`  | two measured inter-hop delays, microseconds      |
//! | `qualities`  | two channel-quality samples (decay x 10000)      |
//! | `chain`      | up to three most recent satellites on the path   |
//! | `last_node`  | previous satellite, for loop avoidance           |
//!
//! Absent node slots are encoded as `u32::MAX`.
//!
//! ## Gossip tag
//!
//! Source and target satellite, 8 bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::identity::{NodeId, PacketId};
use crate::time::SimTime;

const NO_NODE: u32 = u32::MAX;

/// Per-packet routing metadata, rebuilt at every hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTag {
    pub id: PacketId,
    pub hops: u32,
    pub timestamp: u32,
    pub intervals: [u32; 2],
    pub qualities: [u32; 2],
    pub chain: [Option<NodeId>; 3],
    pub last_node: Option<NodeId>,
}

impl RoutingTag {
    /// Encoded size in bytes
    pub const WIRE_SIZE: usize = 44;

    /// Fresh tag for a packet entering the constellation
    pub fn new(id: PacketId, created: SimTime) -> Self {
        Self {
            id,
            hops: 0,
            timestamp: created.tag_micros(),
            intervals: [0; 2],
            qualities: [0; 2],
            chain: [None; 3],
            last_node: None,
        }
    }

    /// Number of satellites recorded in the reward chain
    pub fn chain_len(&self) -> usize {
        self.chain.iter().take_while(|slot| slot.is_some()).count()
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::WIRE_SIZE);
        buf.put_u32(self.id.0);
        buf.put_u32(self.hops);
        buf.put_u32(self.timestamp);
        for v in self.intervals {
            buf.put_u32(v);
        }
        for v in self.qualities {
            buf.put_u32(v);
        }
        for slot in self.chain {
            buf.put_u32(encode_node(slot));
        }
        buf.put_u32(encode_node(self.last_node));
        buf.freeze()
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::WIRE_SIZE {
            return Err(WireError::Truncated {
                expected: Self::WIRE_SIZE,
                actual: buf.len(),
            });
        }
        if buf.len() > Self::WIRE_SIZE {
            return Err(WireError::Trailing(buf.len() - Self::WIRE_SIZE));
        }
        let id = PacketId(buf.get_u32());
        let hops = buf.get_u32();
        let timestamp = buf.get_u32();
        let intervals = [buf.get_u32(), buf.get_u32()];
        let qualities = [buf.get_u32(), buf.get_u32()];
        let chain = [
            decode_node(buf.get_u32()),
            decode_node(buf.get_u32()),
            decode_node(buf.get_u32()),
        ];
        let last_node = decode_node(buf.get_u32());
        Ok(Self {
            id,
            hops,
            timestamp,
            intervals,
            qualities,
            chain,
            last_node,
        })
    }
}

/// Header of a point-to-point link-state broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GossipTag {
    pub source: NodeId,
    pub target: NodeId,
}

impl GossipTag {
    pub const WIRE_SIZE: usize = 8;

    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.source.0);
        buf.put_u32(self.target.0);
    }

    /// Decode the header from the front of `buf`, advancing past it
    pub fn decode_from(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(WireError::Truncated {
                expected: Self::WIRE_SIZE,
                actual: buf.remaining(),
            });
        }
        Ok(Self {
            source: NodeId(buf.get_u32()),
            target: NodeId(buf.get_u32()),
        })
    }
}

fn encode_node(node: Option<NodeId>) -> u32 {
    node.map_or(NO_NODE, NodeId::as_u32)
}

fn decode_node(raw: u32) -> Option<NodeId> {
    (raw != NO_NODE).then_some(NodeId(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tag() -> RoutingTag {
        RoutingTag {
            id: PacketId(42),
            hops: 3,
            timestamp: 123_456,
            intervals: [1000, 1500],
            qualities: [9000, 8500],
            chain: [Some(NodeId(0)), Some(NodeId(1)), None],
            last_node: Some(NodeId(1)),
        }
    }

    #[test]
    fn test_routing_tag_layout() {
        let bytes = make_tag().encode();
        assert_eq!(bytes.len(), RoutingTag::WIRE_SIZE);
        // id first, last_node last
        assert_eq!(&bytes[0..4], &42u32.to_be_bytes());
        assert_eq!(&bytes[36..40], &u32::MAX.to_be_bytes());
        assert_eq!(&bytes[40..44], &1u32.to_be_bytes());
        assert_eq!(RoutingTag::decode(&bytes).unwrap(), make_tag());
    }

    #[test]
    fn test_routing_tag_rejects_bad_length() {
        let bytes = make_tag().encode();
        assert!(matches!(
            RoutingTag::decode(&bytes[..40]),
            Err(WireError::Truncated { expected: 44, actual: 40 })
        ));
        let mut long = bytes.to_vec();
        long.push(0);
        assert!(matches!(RoutingTag::decode(&long), Err(WireError::Trailing(1))));
    }

    #[test]
    fn test_fresh_tag_has_empty_chain() {
        let tag = RoutingTag::new(PacketId(7), SimTime::from_millis(2));
        assert_eq!(tag.chain_len(), 0);
        assert_eq!(tag.timestamp, 2_000);
        assert_eq!(tag.last_node, None);
    }

    #[test]
    fn test_gossip_tag_size() {
        let mut buf = BytesMut::new();
        GossipTag::new(NodeId(3), NodeId(14)).encode_into(&mut buf);
        assert_eq!(buf.len(), GossipTag::WIRE_SIZE);
        let mut read = buf.freeze();
        let tag = GossipTag::decode_from(&mut read).unwrap();
        assert_eq!(tag.source, NodeId(3));
        assert_eq!(tag.target, NodeId(14));
    }
}
