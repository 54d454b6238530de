//! Event types and priority queue for the discrete event simulation

use std::cmp::Ordering;

use bytes::Bytes;
use starmesh_core::{Direction, NodeId, SimTime};
use starmesh_routing::PeriodicTask;

/// Unique sequence number for deterministic ordering of same-time events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A data packet in flight. The routing tag travels in its wire form.
#[derive(Debug, Clone)]
pub struct Packet {
    pub source: NodeId,
    pub destination: NodeId,
    pub created: SimTime,
    pub size_bytes: u32,
    pub tag: Bytes,
}

/// Events in the discrete event simulation
#[derive(Debug, Clone)]
pub enum Event {
    /// A ground flow emits its next packet
    Generate { flow: usize },
    /// A packet reaches a satellite, from the ground or over a link
    Arrive {
        node: NodeId,
        packet: Packet,
        /// Arrival direction at `node`, `None` for an uplink
        via: Option<Direction>,
    },
    /// A packet finished serializing onto a link
    TransmitDone {
        node: NodeId,
        direction: Direction,
        packet: Packet,
    },
    /// An engine's periodic task is due
    Periodic { node: NodeId, task: PeriodicTask },
    /// A link-state gossip message reaches its neighbor
    Gossip { to: NodeId, payload: Bytes },
    /// Constellation geometry and fault injection step
    ChannelUpdate,
    /// The policy oracle finishes warming up
    PolicyReady,
}

/// A scheduled event with timestamp and sequence number for ordering
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time: SimTime,
    pub seq: SequenceNumber,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(time: SimTime, seq: SequenceNumber, event: Event) -> Self {
        Self { time, seq, event }
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        match other.time.cmp(&self.time) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}
