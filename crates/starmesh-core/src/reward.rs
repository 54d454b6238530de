//! Decision outcomes and delayed reward messages

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{NodeId, PacketId};

/// Classification of a forwarding decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionOutcome {
    /// Moved along a shortest path toward the destination
    Approaching,
    /// Detoured away from the destination
    Away,
    /// No usable link, or the chosen queue is full
    Drop,
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionOutcome::Approaching => "approaching",
            DecisionOutcome::Away => "away",
            DecisionOutcome::Drop => "drop",
        };
        f.write_str(s)
    }
}

/// Credit for an earlier forwarding decision, addressed to the satellite that made it.
///
/// Delivered through the receiving engine's inbox on the same tick it was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardMessage {
    pub to: NodeId,
    pub packet_id: PacketId,
    pub intervals: [u32; 2],
    pub qualities: [u32; 2],
    pub outcome: DecisionOutcome,
}
