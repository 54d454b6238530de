//! Shared decision skeleton: candidate classification
//!
//! ## Selection priority
//!
//! With the arrival direction removed from both masks, and scanning only
//! directions whose link is UP:
//!
//! 1. any approach direction (outcome: approaching)
//! 2. else any away direction whose opposite is not an approach direction (outcome: away)
//! 3. else any away direction (outcome: away)
//! 4. else the first approach direction, or failing that the first away
//!    direction, regardless of link state (outcome: drop)
//!
//! More than one qualifying direction in the winning tier is a tie, broken
//! by the engine's [`Strategy`].

use derive_more::Display;
use serde::{Deserialize, Serialize};
use starmesh_core::{DecisionOutcome, Direction, DirectionSet, LinkSnapshot};

/// Physical metric used by the static strategy to break ties
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    #[display("shortest-distance")]
    ShortestDistance,
    #[display("shortest-queue")]
    ShortestQueue,
    #[display("maximum-bandwidth")]
    MaximumBandwidth,
}

/// How an engine resolves ties between equally qualifying directions
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    #[display("static({_0})")]
    StaticMetric(MetricKind),
    #[display("adaptive")]
    AdaptivePolicy,
}

/// Which selection tier produced the feasible set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Approach,
    AwayNotReversing,
    Away,
    Drop,
}

/// Result of classifying the four directions for one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidates {
    /// Approach directions after loop avoidance
    pub approach: DirectionSet,
    /// Away directions after loop avoidance
    pub away: DirectionSet,
    /// Directions qualifying in the winning tier
    pub feasible: DirectionSet,
    pub tier: Tier,
    pub outcome: DecisionOutcome,
}

impl Candidates {
    /// Whether more than one direction qualifies
    pub fn is_tie(&self) -> bool {
        self.feasible.len() > 1
    }
}

/// Classify the four directions into a feasible set and an outcome.
///
/// `arrived_from` is the slot the packet came in on when the previous hop
/// was a satellite neighbor; it is excluded from every tier.
pub fn classify(
    approach: DirectionSet,
    arrived_from: Option<Direction>,
    links: &[LinkSnapshot; 4],
) -> Candidates {
    let mut approach = approach;
    let mut away = approach.complement();
    if let Some(back) = arrived_from {
        approach.remove(back);
        away.remove(back);
    }

    let up = |d: &Direction| links[d.index()].is_up();

    let tier_approach: DirectionSet = approach.iter().filter(up).collect();
    if !tier_approach.is_empty() {
        return Candidates {
            approach,
            away,
            feasible: tier_approach,
            tier: Tier::Approach,
            outcome: DecisionOutcome::Approaching,
        };
    }

    let tier_not_reversing: DirectionSet = away
        .iter()
        .filter(up)
        .filter(|d| !approach.contains(d.opposite()))
        .collect();
    if !tier_not_reversing.is_empty() {
        return Candidates {
            approach,
            away,
            feasible: tier_not_reversing,
            tier: Tier::AwayNotReversing,
            outcome: DecisionOutcome::Away,
        };
    }

    let tier_away: DirectionSet = away.iter().filter(up).collect();
    if !tier_away.is_empty() {
        return Candidates {
            approach,
            away,
            feasible: tier_away,
            tier: Tier::Away,
            outcome: DecisionOutcome::Away,
        };
    }

    let fallback = approach.first().or_else(|| away.first());
    Candidates {
        approach,
        away,
        feasible: fallback.into_iter().collect(),
        tier: Tier::Drop,
        outcome: DecisionOutcome::Drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starmesh_core::LinkState;

    fn links_with_down(down: &[Direction]) -> [LinkSnapshot; 4] {
        let mut links = [LinkSnapshot::default(); 4];
        for d in down {
            links[d.index()].state = LinkState::Down;
        }
        links
    }

    fn set(dirs: &[Direction]) -> DirectionSet {
        dirs.iter().copied().collect()
    }

    #[test]
    fn test_approach_tier_wins() {
        let c = classify(
            set(&[Direction::OrbitNext, Direction::PlaneAhead]),
            None,
            &links_with_down(&[]),
        );
        assert_eq!(c.tier, Tier::Approach);
        assert_eq!(c.outcome, DecisionOutcome::Approaching);
        assert!(c.is_tie());
    }

    #[test]
    fn test_arrival_direction_excluded() {
        let c = classify(
            set(&[Direction::OrbitNext, Direction::PlaneAhead]),
            Some(Direction::OrbitNext),
            &links_with_down(&[]),
        );
        assert_eq!(c.feasible, set(&[Direction::PlaneAhead]));
        assert!(!c.approach.contains(Direction::OrbitNext));
        assert!(!c.away.contains(Direction::OrbitNext));
    }

    #[test]
    fn test_away_avoids_reversing_productive_direction() {
        // approach = {0}; 0 is down. Away = {1,2,3}; 1 is the opposite of 0.
        let c = classify(
            set(&[Direction::OrbitNext]),
            None,
            &links_with_down(&[Direction::OrbitNext]),
        );
        assert_eq!(c.tier, Tier::AwayNotReversing);
        assert_eq!(c.feasible, set(&[Direction::PlaneBehind, Direction::PlaneAhead]));
        assert_eq!(c.outcome, DecisionOutcome::Away);
    }

    #[test]
    fn test_away_falls_back_to_reversing() {
        let c = classify(
            set(&[Direction::OrbitNext]),
            None,
            &links_with_down(&[Direction::OrbitNext, Direction::PlaneBehind, Direction::PlaneAhead]),
        );
        assert_eq!(c.tier, Tier::Away);
        assert_eq!(c.feasible, set(&[Direction::OrbitPrev]));
    }

    #[test]
    fn test_all_down_is_drop() {
        let c = classify(
            set(&[Direction::PlaneBehind, Direction::PlaneAhead]),
            Some(Direction::PlaneBehind),
            &links_with_down(&Direction::ALL),
        );
        assert_eq!(c.tier, Tier::Drop);
        assert_eq!(c.outcome, DecisionOutcome::Drop);
        assert_eq!(c.feasible, set(&[Direction::PlaneAhead]));
    }

    #[test]
    fn test_drop_uses_away_when_no_approach_left() {
        let c = classify(
            set(&[Direction::OrbitPrev]),
            Some(Direction::OrbitPrev),
            &links_with_down(&Direction::ALL),
        );
        assert_eq!(c.feasible, set(&[Direction::OrbitNext]));
        assert_eq!(c.outcome, DecisionOutcome::Drop);
    }
}
