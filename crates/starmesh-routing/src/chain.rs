//! Hop-by-hop advancement of the routing tag's reward chain
//!
//! The chain holds the (up to) three most recent satellites a packet has
//! crossed, the two delays measured between them, and the channel quality
//! each of them saw on its outgoing link. Each hop produces a new tag and,
//! depending on how full the chain is, reward messages for earlier hops:
//!
//! - chain empty (packet just came up from the ground): seed it, no reward
//! - one entry: record the first interval; an away or drop outcome is
//!   penalized immediately at both chain entries
//! - two entries: record the second interval and reward the first entry
//! - full: slide the window by one satellite and reward the new oldest entry

use starmesh_core::{DecisionOutcome, NodeId, RewardMessage, RoutingTag, SimTime};

/// Tag update with reward-chain bookkeeping, used by the adaptive strategy.
///
/// `quality` is the channel-quality sample of the link chosen at this hop.
/// Measured intervals are clamped to at least one microsecond.
pub fn advance_tag(
    tag: &RoutingTag,
    me: NodeId,
    now: SimTime,
    quality: u32,
    outcome: DecisionOutcome,
) -> (RoutingTag, Vec<RewardMessage>) {
    let mut next = *tag;
    let mut rewards = Vec::new();
    let measured = now.tag_micros().wrapping_sub(tag.timestamp).max(1);

    let reward = |to: NodeId, tag: &RoutingTag| RewardMessage {
        to,
        packet_id: tag.id,
        intervals: tag.intervals,
        qualities: tag.qualities,
        outcome,
    };

    match tag.chain {
        [None, ..] => {
            next.chain[0] = Some(me);
            next.qualities[0] = quality;
        }
        [Some(first), None, _] => {
            next.intervals[0] = measured;
            next.chain[1] = Some(me);
            next.qualities[1] = quality;
            if outcome != DecisionOutcome::Approaching {
                rewards.push(reward(first, &next));
                rewards.push(reward(me, &next));
            }
        }
        [Some(first), Some(_), None] => {
            next.intervals[1] = measured;
            next.chain[2] = Some(me);
            rewards.push(reward(first, &next));
            next.qualities = [next.qualities[1], quality];
        }
        [Some(_), Some(second), Some(third)] => {
            next.chain = [Some(second), Some(third), Some(me)];
            next.intervals = [next.intervals[1], measured];
            rewards.push(reward(second, &next));
            next.qualities = [next.qualities[1], quality];
        }
    }

    next.hops += 1;
    next.timestamp = now.tag_micros();
    next.last_node = Some(me);
    (next, rewards)
}

/// Tag update for the static strategy: hop count and loop avoidance only
pub fn advance_loop_fields(tag: &RoutingTag, me: NodeId) -> RoutingTag {
    RoutingTag {
        hops: tag.hops + 1,
        last_node: Some(me),
        ..*tag
    }
}
