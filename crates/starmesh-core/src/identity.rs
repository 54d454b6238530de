//! Node identity and inter-satellite link directions
//!
//! Every satellite and ground terminal has a stable integer [`NodeId`].
//! Satellites own exactly four inter-satellite links, addressed by
//! [`Direction`]:
//!
//! - `0` / `1`: next and previous satellite in the same orbit
//! - `2` / `3`: same-phase satellite in the previous and next orbit
//!
//! Directions `0`/`1` and `2`/`3` are opposites of each other.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Stable identity of a satellite or ground terminal
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw id as carried on the wire
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Globally unique packet identifier
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("#{_0}")]
pub struct PacketId(pub u32);

/// Packet id source owned by a simulation session.
///
/// Passed explicitly to every packet-creation site, so two sessions in the
/// same process never share a sequence.
#[derive(Debug, Default)]
pub struct PacketIdCounter {
    next: u32,
}

impl PacketIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next packet id
    pub fn next_id(&mut self) -> PacketId {
        let id = PacketId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// One of the four inter-satellite link slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// Next satellite in the same orbit
    OrbitNext = 0,
    /// Previous satellite in the same orbit
    OrbitPrev = 1,
    /// Same-phase satellite in the previous orbit
    PlaneBehind = 2,
    /// Same-phase satellite in the next orbit
    PlaneAhead = 3,
}

impl Direction {
    /// All directions in slot order
    pub const ALL: [Direction; 4] = [
        Direction::OrbitNext,
        Direction::OrbitPrev,
        Direction::PlaneBehind,
        Direction::PlaneAhead,
    ];

    /// Slot index (0..3)
    pub fn index(self) -> usize {
        self as usize
    }

    /// The direction that would immediately reverse this one
    pub fn opposite(self) -> Self {
        match self {
            Direction::OrbitNext => Direction::OrbitPrev,
            Direction::OrbitPrev => Direction::OrbitNext,
            Direction::PlaneBehind => Direction::PlaneAhead,
            Direction::PlaneAhead => Direction::PlaneBehind,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// A set of directions, stored as a 4-bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);
    pub const FULL: DirectionSet = DirectionSet(0b1111);

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= 1 << direction.index();
    }

    pub fn remove(&mut self, direction: Direction) {
        self.0 &= !(1 << direction.index());
    }

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & (1 << direction.index()) != 0
    }

    /// Directions not in this set
    pub fn complement(self) -> Self {
        DirectionSet(!self.0 & Self::FULL.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lowest-indexed member
    pub fn first(self) -> Option<Direction> {
        self.iter().next()
    }

    /// Members in slot order
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<T: IntoIterator<Item = Direction>>(iter: T) -> Self {
        let mut set = DirectionSet::EMPTY;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}
