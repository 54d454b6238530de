//! Link and node state as observed by a forwarding engine
//!
//! These are read-only snapshots handed to the engine by the link/channel
//! collaborator; the engine never mutates link state.

use serde::{Deserialize, Serialize};

/// Fault-injection state of an inter-satellite link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkState {
    #[default]
    Up,
    Down,
}

/// Snapshot of one inter-satellite link, taken at the sending side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub state: LinkState,
    /// Packets currently queued for transmission
    pub queue_len: u32,
    /// Queue capacity in packets
    pub max_queue: u32,
    /// Physical distance to the neighbor, km
    pub distance_km: f64,
    /// Bandwidth/quality decay factor in [0, 1]
    pub decay_factor: f64,
    /// Nominal data rate, bits per second
    pub data_rate_bps: f64,
    /// Relative speed of the neighbor, km/s
    pub relative_speed: f64,
}

impl LinkSnapshot {
    pub fn is_up(&self) -> bool {
        self.state == LinkState::Up
    }

    /// Queue occupancy as a fraction of capacity
    pub fn queue_ratio(&self) -> f64 {
        if self.max_queue == 0 {
            return 0.0;
        }
        self.queue_len as f64 / self.max_queue as f64
    }

    /// Whether one more enqueued packet would fill the queue
    pub fn would_overflow(&self) -> bool {
        self.queue_len + 1 >= self.max_queue
    }

    /// Channel quality sample as carried in the routing tag
    pub fn quality_sample(&self) -> u32 {
        (self.decay_factor.clamp(0.0, 1.0) * 10_000.0) as u32
    }
}

impl Default for LinkSnapshot {
    fn default() -> Self {
        Self {
            state: LinkState::Up,
            queue_len: 0,
            max_queue: 100,
            distance_km: 0.0,
            decay_factor: 1.0,
            data_rate_bps: 0.0,
            relative_speed: 0.0,
        }
    }
}

/// Sub-satellite point of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// Cumulative packet counters of one satellite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    pub isl_sent: [u64; 4],
    pub isl_received: [u64; 4],
    pub ground_sent: u64,
    pub ground_received: u64,
}

impl TrafficCounters {
    /// Per-field difference against an earlier reading
    pub fn delta_since(&self, earlier: &TrafficCounters) -> TrafficCounters {
        let mut out = TrafficCounters::default();
        for i in 0..4 {
            out.isl_sent[i] = self.isl_sent[i].saturating_sub(earlier.isl_sent[i]);
            out.isl_received[i] = self.isl_received[i].saturating_sub(earlier.isl_received[i]);
        }
        out.ground_sent = self.ground_sent.saturating_sub(earlier.ground_sent);
        out.ground_received = self.ground_received.saturating_sub(earlier.ground_received);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_threshold() {
        let mut link = LinkSnapshot {
            max_queue: 10,
            queue_len: 8,
            ..Default::default()
        };
        assert!(!link.would_overflow());
        link.queue_len = 9;
        assert!(link.would_overflow());
    }

    #[test]
    fn test_quality_sample() {
        let link = LinkSnapshot {
            decay_factor: 0.8125,
            ..Default::default()
        };
        assert_eq!(link.quality_sample(), 8125);
    }

    #[test]
    fn test_counter_delta() {
        let earlier = TrafficCounters {
            isl_sent: [1, 2, 3, 4],
            ground_sent: 5,
            ..Default::default()
        };
        let now = TrafficCounters {
            isl_sent: [3, 2, 10, 4],
            ground_sent: 9,
            ..Default::default()
        };
        let delta = now.delta_since(&earlier);
        assert_eq!(delta.isl_sent, [2, 0, 7, 0]);
        assert_eq!(delta.ground_sent, 4);
    }
}
