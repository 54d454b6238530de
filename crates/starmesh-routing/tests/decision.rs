//! End-to-end tests for the decision engine on a small torus
//!
//! Geometry: 4 orbits x 6 satellites. Satellite 0 and satellite 15
//! (orbit 2, phase 3) are antipodal, so all four directions out of 0 lie on
//! a shortest path toward 15. Ground terminal `24 + n` hangs off satellite `n`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starmesh_core::testing::{FixedPolicy, MemoryView};
use starmesh_core::{
    ConstellationGeometry, DecisionOutcome, Direction, LinkState, NodeId, PacketId, PolicyError,
    RewardMessage, RoutingTag, SimTime,
};
use starmesh_routing::{
    Accumulator, Credit, DecisionEngine, EngineConfig, GroundAttachments, MetricKind,
    NeighborTable, PeriodicTask, RewardParams, RouteDecision, RouteRequest, RoutingError,
    StaticRoutingTable, Strategy, compute_reward,
};

const ORBITS: u32 = 4;
const PER_ORBIT: u32 = 6;
const SATS: u32 = ORBITS * PER_ORBIT;

fn geometry() -> ConstellationGeometry {
    ConstellationGeometry::new(ORBITS, PER_ORBIT)
}

fn terminal(sat: u32) -> NodeId {
    NodeId(SATS + sat)
}

fn torus_edges() -> Vec<(NodeId, NodeId)> {
    let geo = geometry();
    let mut edges = Vec::new();
    for orbit in 0..ORBITS {
        for phase in 0..PER_ORBIT {
            let me = geo.satellite_at(orbit, phase);
            edges.push((me, geo.satellite_at(orbit, phase + 1)));
            edges.push((me, geo.satellite_at(orbit + 1, phase)));
        }
    }
    edges
}

fn shortest_table(node: NodeId, edges: &[(NodeId, NodeId)]) -> StaticRoutingTable {
    let geo = geometry();
    let neighbors = NeighborTable::from_edges(node, &geo, edges).unwrap();
    let mut routes = BTreeMap::new();
    for dest in (0..SATS).map(NodeId).filter(|d| *d != node) {
        let here = geo.remaining_hops(node, dest);
        let hops: Vec<NodeId> = neighbors
            .ids()
            .into_iter()
            .filter(|n| geo.remaining_hops(*n, dest) < here)
            .collect();
        routes.insert(dest, hops);
    }
    StaticRoutingTable::new(node, routes)
}

fn ground() -> Arc<GroundAttachments> {
    Arc::new((0..SATS).map(|s| (terminal(s), NodeId(s))).collect())
}

fn adaptive_engine(node: u32, policy: Arc<FixedPolicy>) -> DecisionEngine {
    let edges = torus_edges();
    DecisionEngine::builder(NodeId(node), geometry())
        .strategy(Strategy::AdaptivePolicy)
        .policy(policy)
        .ground(ground())
        .config(EngineConfig::default().with_seed(7))
        .build(&edges, shortest_table(NodeId(node), &edges))
        .unwrap()
}

fn static_engine(node: u32, metric: MetricKind) -> DecisionEngine {
    let edges = torus_edges();
    DecisionEngine::builder(NodeId(node), geometry())
        .strategy(Strategy::StaticMetric(metric))
        .ground(ground())
        .build(&edges, shortest_table(NodeId(node), &edges))
        .unwrap()
}

/// Ground-to-ground request arriving at a satellite
fn transit(id: u32, from_sat: u32, to_sat: u32, last_node: Option<NodeId>) -> RouteRequest {
    let mut tag = RoutingTag::new(PacketId(id), SimTime::ZERO);
    tag.last_node = last_node;
    RouteRequest {
        source: terminal(from_sat),
        destination: terminal(to_sat),
        tag,
        is_gossip: false,
    }
}

fn forward(decision: RouteDecision) -> starmesh_routing::Forward {
    match decision {
        RouteDecision::Forward(f) => f,
        other => panic!("expected forward, got {other:?}"),
    }
}

#[test]
fn test_every_node_has_four_distinct_neighbors() {
    let edges = torus_edges();
    for node in 0..SATS {
        let table = NeighborTable::from_edges(NodeId(node), &geometry(), &edges).unwrap();
        let mut ids = table.ids().to_vec();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4, "satellite {node}");
    }
}

#[test]
fn test_construction_fails_without_four_neighbors() {
    let edges: Vec<_> = torus_edges()
        .into_iter()
        .filter(|(a, _)| *a != NodeId(0))
        .collect();
    let err = DecisionEngine::builder(NodeId(0), geometry())
        .strategy(Strategy::StaticMetric(MetricKind::ShortestQueue))
        .build(&edges, StaticRoutingTable::new(NodeId(0), BTreeMap::new()))
        .unwrap_err();
    assert!(matches!(err, RoutingError::Topology(_)));
}

#[test]
fn test_adaptive_without_policy_is_rejected() {
    let edges = torus_edges();
    let err = DecisionEngine::builder(NodeId(0), geometry())
        .build(&edges, shortest_table(NodeId(0), &edges))
        .unwrap_err();
    assert!(matches!(err, RoutingError::MissingPolicy(NodeId(0))));
}

#[test]
fn test_loop_avoidance_under_random_link_states() {
    let mut rng = StdRng::seed_from_u64(99);
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    for node in 0..SATS {
        let mut engines = vec![
            static_engine(node, MetricKind::ShortestDistance),
            adaptive_engine(node, policy.clone()),
        ];
        for engine in &mut engines {
            let neighbors = engine.neighbors().clone();
            for dest in (0..SATS).filter(|d| *d != node) {
                for arrival in Direction::ALL {
                    let mut view = MemoryView::new();
                    for d in Direction::ALL {
                        if rng.random_bool(0.4) {
                            view.set_state(NodeId(node), d, LinkState::Down);
                        }
                    }
                    let request = transit(dest, 0, dest, Some(neighbors.neighbor(arrival)));
                    let f = forward(engine.route(&request, &view, SimTime::ZERO).unwrap());
                    assert_ne!(f.direction, arrival, "satellite {node} -> {dest}");
                }
            }
        }
    }
}

#[test]
fn test_up_approach_direction_is_never_away_or_drop() {
    let mut rng = StdRng::seed_from_u64(5);
    let policy = Arc::new(FixedPolicy::new([0.1, 0.2, 0.3, 0.4]));
    for node in [0, 7, 15, 22] {
        let table = shortest_table(NodeId(node), &torus_edges());
        let mut engine = adaptive_engine(node, policy.clone());
        let mut fixed = static_engine(node, MetricKind::MaximumBandwidth);
        for dest in (0..SATS).filter(|d| *d != node) {
            let approach: Vec<Direction> = table
                .candidates(NodeId(dest))
                .unwrap()
                .iter()
                .map(|n| engine.neighbors().direction_of(*n).unwrap())
                .collect();
            let mut view = MemoryView::new();
            for d in Direction::ALL {
                if rng.random_bool(0.5) {
                    view.set_state(NodeId(node), d, LinkState::Down);
                }
            }
            // keep one approach link up
            view.set_state(NodeId(node), approach[0], LinkState::Up);

            let request = transit(dest, 0, dest, None);
            for engine in [&mut engine, &mut fixed] {
                let f = forward(engine.route(&request, &view, SimTime::ZERO).unwrap());
                assert_eq!(f.outcome, Some(DecisionOutcome::Approaching));
                assert!(approach.contains(&f.direction));
            }
        }
    }
}

#[test]
fn test_static_distance_tie_break_selects_980() {
    let mut engine = static_engine(0, MetricKind::ShortestDistance);
    let mut view = MemoryView::new();
    view.link_mut(NodeId(0), Direction::OrbitNext).distance_km = 1200.0;
    view.link_mut(NodeId(0), Direction::OrbitPrev).distance_km = 980.0;
    view.link_mut(NodeId(0), Direction::PlaneBehind).distance_km = 1500.0;
    view.link_mut(NodeId(0), Direction::PlaneAhead).distance_km = 10.0;

    // arrived over PlaneAhead, leaving three tied approach directions
    let arrival = engine.neighbors().neighbor(Direction::PlaneAhead);
    let f = forward(
        engine
            .route(&transit(1, 20, 15, Some(arrival)), &view, SimTime::ZERO)
            .unwrap(),
    );
    assert_eq!(f.direction, Direction::OrbitPrev);
    assert_eq!(f.next_hop, NodeId(5));
    assert_eq!(f.outcome, Some(DecisionOutcome::Approaching));
    assert!(f.rewards.is_empty());
    assert_eq!(f.tag.hops, 1);
    assert_eq!(f.tag.last_node, Some(NodeId(0)));
    assert_eq!(f.tag.chain, [None; 3]);
}

#[test]
fn test_cache_determinism_within_epoch() {
    let policy = Arc::new(FixedPolicy::new([0.4, 0.1, 0.3, 0.2]));
    let mut a = adaptive_engine(0, policy.clone());
    let mut b = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();

    let mut picks_a = Vec::new();
    let mut picks_b = Vec::new();
    for i in 0..40 {
        let now = SimTime::from_micros(i * 1_000);
        picks_a.push(forward(a.route(&transit(i as u32, 0, 15, None), &view, now).unwrap()).direction);
        picks_b.push(forward(b.route(&transit(i as u32, 0, 15, None), &view, now).unwrap()).direction);
    }
    assert_eq!(picks_a, picks_b);
    assert_eq!(a.policy_queries(), 1);
    assert_eq!(a.distinct_masks(), 1);
    assert_eq!(policy.query_count(), 2);
    // a 40/10/30/20 vector over 40 draws should not collapse onto one direction
    assert!(picks_a.iter().any(|d| *d != picks_a[0]));
}

#[test]
fn test_stale_entry_triggers_new_query() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();
    engine.route(&transit(1, 0, 15, None), &view, SimTime::ZERO).unwrap();
    engine
        .route(&transit(2, 0, 15, None), &view, SimTime::from_millis(99))
        .unwrap();
    assert_eq!(engine.policy_queries(), 1);
    engine
        .route(&transit(3, 0, 15, None), &view, SimTime::from_millis(100))
        .unwrap();
    assert_eq!(engine.policy_queries(), 2);
    assert_eq!(engine.distinct_masks(), 1);
}

#[test]
fn test_refresh_resets_accumulator_and_purges_pending() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();

    engine.route(&transit(1, 0, 15, None), &view, SimTime::ZERO).unwrap();
    engine
        .route(&transit(2, 0, 15, None), &view, SimTime::from_millis(10))
        .unwrap();
    let key = engine.ledger().pending_mask(PacketId(1)).cloned().unwrap();
    assert_eq!(engine.ledger().pending_for(&key), 2);

    engine.enqueue_reward(RewardMessage {
        to: NodeId(0),
        packet_id: PacketId(1),
        intervals: [1000, 1500],
        qualities: [9000, 9000],
        outcome: DecisionOutcome::Approaching,
    });
    assert_eq!(engine.process_inbox().unwrap(), 1);
    let acc = engine.ledger().accumulator(&key).unwrap();
    assert_eq!(acc.count, 1);
    assert!((acc.total - 1.0601).abs() < 1e-4);

    engine
        .route(&transit(3, 0, 15, None), &view, SimTime::from_millis(150))
        .unwrap();
    assert_eq!(
        engine.ledger().accumulator(&key),
        Some(Accumulator { total: 0.0, count: 0 })
    );
    assert!(engine.ledger().pending_mask(PacketId(2)).is_none());
    assert_eq!(engine.ledger().pending_for(&key), 1);
    let reported = policy.reported_rewards();
    assert_eq!(reported[0], 0.0);
    assert!((reported[1] - 1.0601).abs() < 1e-4);

    // packet 2's feedback window has closed
    engine.enqueue_reward(RewardMessage {
        to: NodeId(0),
        packet_id: PacketId(2),
        intervals: [1000, 1000],
        qualities: [0, 0],
        outcome: DecisionOutcome::Away,
    });
    assert_eq!(engine.process_inbox().unwrap(), 0);
    assert_eq!(engine.stats().rewards_expired, 1);
}

#[test]
fn test_reward_reaches_first_satellite_after_third_hop() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engines: Vec<DecisionEngine> =
        (0..SATS).map(|n| adaptive_engine(n, policy.clone())).collect();
    let view = MemoryView::new();

    let mut request = transit(77, 0, 15, None);
    let mut at = NodeId(0);
    let times = [0, 1_000, 2_500];
    let mut emitted = Vec::new();
    for t in times {
        let f = forward(
            engines[at.0 as usize]
                .route(&request, &view, SimTime::from_micros(t))
                .unwrap(),
        );
        emitted.extend(f.rewards.iter().copied());
        request.tag = f.tag;
        at = f.next_hop;
    }

    let key = engines[0].ledger().pending_mask(PacketId(77)).cloned().unwrap();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].to, NodeId(0));
    assert_eq!(emitted[0].intervals, [1000, 1500]);

    for message in emitted {
        engines[message.to.0 as usize].enqueue_reward(message);
    }
    assert_eq!(engines[0].process_inbox().unwrap(), 1);
    let acc = engines[0].ledger().accumulator(&key).unwrap();
    let expected = compute_reward(
        &RewardParams::default(),
        DecisionOutcome::Approaching,
        [1000, 1500],
    );
    assert_eq!(acc.count, 1);
    assert!((acc.total - expected).abs() < 1e-12);
    assert!((expected - 1.0601).abs() < 1e-4);
    assert!(engines[0].ledger().pending_mask(PacketId(77)).is_none());
}

#[test]
fn test_inference_mode_records_nothing() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]).inference());
    let mut engine = adaptive_engine(0, policy);
    let view = MemoryView::new();
    let mut request = transit(1, 0, 15, None);
    request.tag.chain = [Some(NodeId(30)), Some(NodeId(31)), Some(NodeId(32))];
    request.tag.last_node = Some(NodeId(18));
    let f = forward(engine.route(&request, &view, SimTime::from_millis(1)).unwrap());
    assert!(f.rewards.is_empty());
    assert!(engine.ledger().pending_mask(PacketId(1)).is_none());
    assert_eq!(f.tag.chain[2], Some(NodeId(0)));
}

#[test]
fn test_full_queue_reclassifies_as_drop() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy);
    let mut view = MemoryView::new();
    for d in Direction::ALL {
        view.link_mut(NodeId(0), d).queue_len = 99;
    }
    let f = forward(engine.route(&transit(1, 0, 15, None), &view, SimTime::ZERO).unwrap());
    assert_eq!(f.outcome, Some(DecisionOutcome::Drop));
    assert_eq!(engine.stats().drops, 1);
}

#[test]
fn test_lone_approach_link_near_full_is_still_approaching() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let mut view = MemoryView::new();
    // satellite 1 is reachable only along OrbitNext, one slot short of full
    view.link_mut(NodeId(0), Direction::OrbitNext).queue_len = 99;

    let f = forward(engine.route(&transit(1, 10, 1, None), &view, SimTime::ZERO).unwrap());
    assert_eq!(f.direction, Direction::OrbitNext);
    assert_eq!(f.outcome, Some(DecisionOutcome::Approaching));
    assert_eq!(engine.stats().drops, 0);
    assert_eq!(policy.query_count(), 0);
}

#[test]
fn test_congested_single_approach_never_away_or_drop() {
    let policy = Arc::new(FixedPolicy::new([0.1, 0.2, 0.3, 0.4]));
    for node in [0, 7, 15, 22] {
        let table = shortest_table(NodeId(node), &torus_edges());
        let mut engine = adaptive_engine(node, policy.clone());
        let mut fixed = static_engine(node, MetricKind::ShortestQueue);
        for dest in (0..SATS).filter(|d| *d != node) {
            let approach = engine
                .neighbors()
                .direction_of(table.candidates(NodeId(dest)).unwrap()[0])
                .unwrap();
            let mut view = MemoryView::new();
            for d in Direction::ALL {
                view.link_mut(NodeId(node), d).queue_len = 99;
                if d != approach {
                    view.set_state(NodeId(node), d, LinkState::Down);
                }
            }

            let request = transit(dest, 0, dest, None);
            for engine in [&mut engine, &mut fixed] {
                let f = forward(engine.route(&request, &view, SimTime::ZERO).unwrap());
                assert_eq!(f.direction, approach, "satellite {node} -> {dest}");
                assert_eq!(f.outcome, Some(DecisionOutcome::Approaching));
            }
        }
    }
}

#[test]
fn test_failed_query_keeps_reward_state() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();

    engine.route(&transit(1, 0, 15, None), &view, SimTime::ZERO).unwrap();
    engine
        .route(&transit(2, 0, 15, None), &view, SimTime::from_millis(10))
        .unwrap();
    let key = engine.ledger().pending_mask(PacketId(1)).cloned().unwrap();
    engine.enqueue_reward(RewardMessage {
        to: NodeId(0),
        packet_id: PacketId(1),
        intervals: [1000, 1500],
        qualities: [9000, 9000],
        outcome: DecisionOutcome::Approaching,
    });
    assert_eq!(engine.process_inbox().unwrap(), 1);
    let before = engine.ledger().accumulator(&key).unwrap();
    assert_eq!(before.count, 1);

    // the cache entry is stale at 150 ms, so each of these re-queries
    policy.set_failing(true);
    let err = engine
        .route(&transit(3, 0, 15, None), &view, SimTime::from_millis(150))
        .unwrap_err();
    assert!(matches!(err, RoutingError::Policy(PolicyError::QueryFailed(_))));

    policy.set_failing(false);
    policy.set_probabilities([0.0; 4]);
    let err = engine
        .route(&transit(4, 0, 15, None), &view, SimTime::from_millis(150))
        .unwrap_err();
    assert!(matches!(
        err,
        RoutingError::Policy(PolicyError::InvalidProbabilities(_))
    ));

    assert_eq!(engine.ledger().accumulator(&key), Some(before));
    assert_eq!(engine.ledger().pending_mask(PacketId(2)), Some(&key));
    assert_eq!(engine.ledger().pending_count(), 1);
    assert_eq!(engine.policy_queries(), 1);

    // a good answer closes the window and reports what was earned
    policy.set_probabilities([0.25; 4]);
    engine
        .route(&transit(5, 0, 15, None), &view, SimTime::from_millis(160))
        .unwrap();
    assert_eq!(engine.policy_queries(), 2);
    assert!(engine.ledger().pending_mask(PacketId(2)).is_none());
    let reported = policy.reported_rewards();
    assert!((reported[reported.len() - 1] - 1.0601).abs() < 1e-4);
}

#[test]
fn test_gossip_packets_never_await_rewards() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();
    let mut request = transit(1, 0, 15, None);
    request.is_gossip = true;

    let f = forward(engine.route(&request, &view, SimTime::ZERO).unwrap());
    assert_eq!(f.outcome, Some(DecisionOutcome::Approaching));
    assert_eq!(engine.policy_queries(), 1);
    assert!(engine.ledger().pending_mask(PacketId(1)).is_none());
    assert_eq!(engine.ledger().pending_count(), 0);
}

#[test]
fn test_nearby_destination_never_awaits_rewards() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let mut view = MemoryView::new();
    // satellite 1 is one hop out; with OrbitNext down the two cross-plane
    // links tie in the away tier
    view.set_state(NodeId(0), Direction::OrbitNext, LinkState::Down);

    let f = forward(engine.route(&transit(1, 10, 1, None), &view, SimTime::ZERO).unwrap());
    assert_eq!(f.outcome, Some(DecisionOutcome::Away));
    assert!(matches!(f.direction, Direction::PlaneBehind | Direction::PlaneAhead));
    assert_eq!(engine.stats().ties, 1);
    assert_eq!(engine.policy_queries(), 1);
    assert_eq!(engine.ledger().pending_count(), 0);
}

#[test]
fn test_all_links_down_still_returns_a_direction() {
    let mut engine = static_engine(0, MetricKind::ShortestQueue);
    let mut view = MemoryView::new();
    for d in Direction::ALL {
        view.set_state(NodeId(0), d, LinkState::Down);
    }
    let arrival = engine.neighbors().neighbor(Direction::OrbitNext);
    let f = forward(
        engine
            .route(&transit(1, 20, 15, Some(arrival)), &view, SimTime::ZERO)
            .unwrap(),
    );
    assert_eq!(f.outcome, Some(DecisionOutcome::Drop));
    assert_eq!(f.direction, Direction::OrbitPrev);
}

#[test]
fn test_policy_not_ready_uses_table_order() {
    let policy = Arc::new(FixedPolicy::not_ready());
    let mut engine = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();
    let f = forward(engine.route(&transit(1, 0, 15, None), &view, SimTime::ZERO).unwrap());
    assert_eq!(f.next_hop, NodeId(1));
    assert_eq!(engine.policy_queries(), 0);
    assert_eq!(engine.cache().len(), 0);
    assert_eq!(engine.stats().not_ready_fallbacks, 1);
}

#[test]
fn test_single_feasible_direction_skips_policy() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy.clone());
    let view = MemoryView::new();
    // satellite 1 is one hop away along OrbitNext
    let f = forward(engine.route(&transit(1, 10, 1, None), &view, SimTime::ZERO).unwrap());
    assert_eq!(f.next_hop, NodeId(1));
    assert_eq!(policy.query_count(), 0);
}

#[test]
fn test_ground_delivery_and_direct_reads() {
    let mut engine = static_engine(15, MetricKind::ShortestDistance);
    let view = MemoryView::new();
    let decision = engine
        .route(&transit(1, 0, 15, None), &view, SimTime::ZERO)
        .unwrap();
    assert_eq!(
        decision,
        RouteDecision::DeliverToGround {
            terminal: terminal(15)
        }
    );

    // satellite-originated traffic reads the table directly and keeps its tag
    let tag = RoutingTag::new(PacketId(9), SimTime::ZERO);
    let request = RouteRequest {
        source: NodeId(15),
        destination: terminal(0),
        tag,
        is_gossip: false,
    };
    let f = forward(engine.route(&request, &view, SimTime::ZERO).unwrap());
    assert_eq!(f.outcome, None);
    assert_eq!(f.tag, tag);
    assert_eq!(engine.stats().direct_reads, 1);
}

#[test]
fn test_unattached_terminal_is_an_error() {
    let mut engine = static_engine(0, MetricKind::ShortestDistance);
    let request = RouteRequest {
        source: terminal(1),
        destination: NodeId(500),
        tag: RoutingTag::new(PacketId(1), SimTime::ZERO),
        is_gossip: false,
    };
    assert!(engine.route(&request, &MemoryView::new(), SimTime::ZERO).is_err());
}

#[test]
fn test_gossip_exchange() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut zero = adaptive_engine(0, policy.clone());
    let mut one = adaptive_engine(1, policy);
    let view = MemoryView::new();

    let messages = zero.compose_gossip(&view, SimTime::ZERO);
    assert_eq!(messages.len(), 4);
    let to_one = messages.iter().find(|m| m.tag.target == NodeId(1)).unwrap();
    assert!(one.receive_gossip(to_one));
    assert!(one.snapshots().get(Direction::OrbitPrev).is_some());

    let to_five = messages.iter().find(|m| m.tag.target == NodeId(5)).unwrap();
    assert!(!one.receive_gossip(to_five));
    assert_eq!(one.stats().gossip_ignored, 1);
}

#[test]
fn test_periodic_schedule() {
    let policy = Arc::new(FixedPolicy::new([0.25; 4]));
    let mut engine = adaptive_engine(0, policy);
    let view = MemoryView::new();
    assert!(matches!(
        engine.run_periodic(PeriodicTask::BroadcastLinkState, &view, SimTime::ZERO),
        Err(RoutingError::NotInstalled(_))
    ));

    let schedule = engine.record_interfaces(&view);
    assert_eq!(schedule.len(), 4);
    assert!(schedule.contains(&(PeriodicTask::BroadcastLinkState, Duration::from_millis(1))));
    assert!(schedule.contains(&(PeriodicTask::RecalculateDistance, Duration::from_millis(100))));

    let out = engine
        .run_periodic(PeriodicTask::BroadcastLinkState, &view, SimTime::from_millis(1))
        .unwrap();
    assert_eq!(out.next_in, Duration::from_millis(50));
    assert_eq!(out.gossip.len(), 4);

    let out = engine
        .run_periodic(PeriodicTask::ResetQueueLength, &view, SimTime::from_millis(1))
        .unwrap();
    assert_eq!(out.next_in, Duration::from_secs(1));
    assert!(out.gossip.is_empty());
}

#[test]
fn test_forwarding_state_dump() {
    let engine = static_engine(0, MetricKind::ShortestDistance);
    let dump = engine.string_repr_of_forwarding_state();
    assert!(dump.starts_with("State of RL Router: 0\n"));
    assert!(dump.contains("  -> 15: {1,5,18,6}\n"));
}

#[test]
fn test_credit_result_for_unknown_packet() {
    let mut ledger = starmesh_routing::RewardLedger::new();
    assert_eq!(ledger.credit(PacketId(3), 1.0), Ok(Credit::Expired));
}
