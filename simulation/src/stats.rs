//! Run statistics

use std::fmt;

use serde::Serialize;
use starmesh_routing::{EngineStats, Strategy};

use crate::policy::OracleStats;

/// Simulation statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimStats {
    pub packets_generated: u64,
    pub packets_delivered: u64,
    pub dropped_link_down: u64,
    pub dropped_queue_full: u64,
    pub dropped_hop_limit: u64,
    /// Packets still in flight when the run ended
    pub in_flight: u64,
    pub total_hops: u64,
    /// Sum of end-to-end latencies, microseconds
    pub total_latency_us: u64,
    pub rewards_routed: u64,
    pub gossip_delivered: u64,
    pub gossip_lost: u64,
    pub link_flips: u64,
}

impl SimStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_link_down + self.dropped_queue_full + self.dropped_hop_limit
    }

    pub fn delivery_ratio(&self) -> f64 {
        if self.packets_generated == 0 {
            return 0.0;
        }
        self.packets_delivered as f64 / self.packets_generated as f64
    }

    pub fn mean_latency_ms(&self) -> f64 {
        if self.packets_delivered == 0 {
            return 0.0;
        }
        self.total_latency_us as f64 / self.packets_delivered as f64 / 1_000.0
    }

    pub fn mean_hops(&self) -> f64 {
        if self.packets_delivered == 0 {
            return 0.0;
        }
        self.total_hops as f64 / self.packets_delivered as f64
    }
}

/// Engine counters summed over every satellite
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineTotals {
    pub decisions: u64,
    pub direct_reads: u64,
    pub ties: u64,
    pub away: u64,
    pub drops: u64,
    pub not_ready_fallbacks: u64,
    pub rewards_emitted: u64,
    pub rewards_applied: u64,
    pub rewards_expired: u64,
    pub gossip_received: u64,
    pub policy_queries: u64,
    pub distinct_masks: usize,
}

impl EngineTotals {
    pub fn add(&mut self, stats: &EngineStats, policy_queries: u64, distinct_masks: usize) {
        self.decisions += stats.decisions;
        self.direct_reads += stats.direct_reads;
        self.ties += stats.ties;
        self.away += stats.away;
        self.drops += stats.drops;
        self.not_ready_fallbacks += stats.not_ready_fallbacks;
        self.rewards_emitted += stats.rewards_emitted;
        self.rewards_applied += stats.rewards_applied;
        self.rewards_expired += stats.rewards_expired;
        self.gossip_received += stats.gossip_received;
        self.policy_queries += policy_queries;
        self.distinct_masks += distinct_masks;
    }
}

/// Everything a finished run reports
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub strategy: String,
    pub seed: u64,
    pub duration_ms: u64,
    pub network: SimStats,
    pub engines: EngineTotals,
    pub oracle: Option<OracleStats>,
}

impl SimReport {
    pub fn new(strategy: Strategy, seed: u64, duration_ms: u64) -> Self {
        Self {
            strategy: strategy.to_string(),
            seed,
            duration_ms,
            network: SimStats::default(),
            engines: EngineTotals::default(),
            oracle: None,
        }
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = &self.network;
        let e = &self.engines;
        writeln!(f, "=== {} (seed {}, {} ms) ===", self.strategy, self.seed, self.duration_ms)?;
        writeln!(f, "  Generated:       {}", n.packets_generated)?;
        writeln!(
            f,
            "  Delivered:       {} ({:.1}%)",
            n.packets_delivered,
            n.delivery_ratio() * 100.0
        )?;
        writeln!(
            f,
            "  Dropped:         {} (link down {}, queue full {}, hop limit {})",
            n.dropped(),
            n.dropped_link_down,
            n.dropped_queue_full,
            n.dropped_hop_limit
        )?;
        writeln!(f, "  In flight:       {}", n.in_flight)?;
        writeln!(f, "  Mean latency:    {:.2} ms", n.mean_latency_ms())?;
        writeln!(f, "  Mean hops:       {:.2}", n.mean_hops())?;
        writeln!(f, "  Link flips:      {}", n.link_flips)?;
        writeln!(
            f,
            "  Decisions:       {} (ties {}, away {}, drop {})",
            e.decisions, e.ties, e.away, e.drops
        )?;
        writeln!(
            f,
            "  Policy:          {} queries over {} masks, {} not-ready fallbacks",
            e.policy_queries, e.distinct_masks, e.not_ready_fallbacks
        )?;
        write!(
            f,
            "  Rewards:         {} emitted, {} applied, {} expired",
            e.rewards_emitted, e.rewards_applied, e.rewards_expired
        )?;
        if let Some(oracle) = &self.oracle {
            write!(f, "\n  Oracle:          mean reported reward {:.4}", oracle.mean_reward)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratios_on_empty_run() {
        let stats = SimStats::default();
        assert_eq!(stats.delivery_ratio(), 0.0);
        assert_eq!(stats.mean_latency_ms(), 0.0);
        assert_eq!(stats.mean_hops(), 0.0);
    }

    #[test]
    fn test_ratios() {
        let stats = SimStats {
            packets_generated: 10,
            packets_delivered: 8,
            dropped_queue_full: 1,
            dropped_link_down: 1,
            total_hops: 40,
            total_latency_us: 160_000,
            ..Default::default()
        };
        assert_eq!(stats.dropped(), 2);
        assert!((stats.delivery_ratio() - 0.8).abs() < 1e-12);
        assert!((stats.mean_latency_ms() - 20.0).abs() < 1e-12);
        assert!((stats.mean_hops() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_display() {
        let mut report = SimReport::new(Strategy::AdaptivePolicy, 3, 500);
        report.network.packets_generated = 4;
        report.network.packets_delivered = 2;
        let text = report.to_string();
        assert!(text.starts_with("=== adaptive (seed 3, 500 ms) ==="));
        assert!(text.contains("Delivered:       2 (50.0%)"));
        assert!(!text.contains("Oracle"));
    }
}
