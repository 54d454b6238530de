//! Per-node observation vector exchanged by link-state gossip
//!
//! Grouped by meaning rather than stored as a flat array. Field order is the
//! order the policy consumes, 56 values in all, and is also the order serde
//! writes them in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Normalized (lat/90, lon/180) of self then the four neighbors
    pub positions: [[f64; 2]; 5],
    /// Data rate per direction, bps / 1e7, zero when the link is down
    pub data_rate: [f64; 4],
    /// Mean idle-queue ratio per direction since the last reset
    pub idle_ratio: [f64; 4],
    /// Distance to each neighbor, km
    pub distance: [f64; 4],
    /// Relative speed of each neighbor, normalized by 280
    pub relative_speed: [f64; 4],
    pub isl_sent: [f64; 4],
    pub isl_received: [f64; 4],
    /// Ground-link packets sent by self then the four neighbors
    pub ground_sent: [f64; 5],
    pub ground_received: [f64; 5],
    /// Probability mass assigned to each direction across live cache entries
    pub busyness: [f64; 4],
    pub queue_ratio: [f64; 4],
    pub decay: [f64; 4],
}

impl FeatureVector {
    /// Ground packets this node reported sending itself
    pub fn own_ground_sent(&self) -> f64 {
        self.ground_sent[0]
    }

    pub fn own_ground_received(&self) -> f64 {
        self.ground_received[0]
    }
}
