//! Per-satellite decision engine
//!
//! The [`DecisionEngine`] owns everything one satellite needs to forward
//! packets: its neighbor table, static routing table, action cache, reward
//! ledger, reward inbox, and gossip snapshots. Nothing in it is shared with
//! other engines; cross-node effects travel only as [`RewardMessage`]s and
//! [`GossipMessage`]s handed back to the caller.
//!
//! ## Routing Algorithm
//!
//! 1. **GROUND**: destination terminal hangs off this satellite, deliver down
//! 2. **DIRECT**: satellite-originated traffic takes the first static candidate
//! 3. **CLASSIFY**: split directions into approach/away, drop the arrival slot,
//!    and pick the winning tier (see [`crate::decision`])
//! 4. **TIE-BREAK**: physical metric or policy sample, per [`Strategy`]
//! 5. **TAG**: advance the routing tag, emitting rewards in adaptive mode

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starmesh_core::{
    ConstellationGeometry, ConstellationView, DecisionOutcome, Direction, DirectionSet,
    FeatureVector, GeoPosition, GossipTag, LinkSnapshot, LinkState, NodeId, Observation,
    PolicyError, PolicyOracle, RewardMessage, RoutingTag, SimTime, TopologyError,
    TrafficCounters,
};
use tracing::{debug, instrument, trace, warn};

use crate::cache::{ActionCache, most_probable, sample_direction};
use crate::chain::{advance_loop_fields, advance_tag};
use crate::config::EngineConfig;
use crate::decision::{Candidates, Strategy, classify};
use crate::error::{RoutingError, RoutingResult};
use crate::gossip::{
    FeatureInputs, GossipMessage, NeighborSnapshots, QueueOccupancy, compose_features,
};
use crate::mask::MaskKey;
use crate::metric::break_tie;
use crate::neighbors::NeighborTable;
use crate::reward::{Credit, RewardLedger, compute_reward};
use crate::table::StaticRoutingTable;

/// Ground terminal to serving satellite
pub type GroundAttachments = BTreeMap<NodeId, NodeId>;

/// A packet presented to the engine for forwarding
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest {
    pub source: NodeId,
    pub destination: NodeId,
    pub tag: RoutingTag,
    pub is_gossip: bool,
}

/// Where a packet goes next
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Hand the packet to the ground link of this satellite
    DeliverToGround { terminal: NodeId },
    Forward(Forward),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forward {
    pub next_hop: NodeId,
    pub direction: Direction,
    /// `None` when the static table was read directly
    pub outcome: Option<DecisionOutcome>,
    /// Tag to carry on the next hop
    pub tag: RoutingTag,
    /// Credit for earlier satellites, to be delivered to their inboxes
    pub rewards: Vec<RewardMessage>,
}

/// Recurring work started by [`DecisionEngine::record_interfaces`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodicTask {
    BroadcastLinkState,
    ResetQueueLength,
    UpdatePacketCount,
    RecalculateDistance,
}

/// Result of running a periodic task
#[derive(Debug, Clone, Default)]
pub struct PeriodicOutput {
    /// Delay until the task should run again
    pub next_in: Duration,
    pub gossip: Vec<GossipMessage>,
}

/// Engine counters
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub decisions: u64,
    pub direct_reads: u64,
    pub ground_deliveries: u64,
    pub ties: u64,
    pub away: u64,
    pub drops: u64,
    pub not_ready_fallbacks: u64,
    pub rewards_emitted: u64,
    pub rewards_applied: u64,
    pub rewards_expired: u64,
    pub gossip_sent: u64,
    pub gossip_received: u64,
    pub gossip_ignored: u64,
    pub link_flips: u64,
}

/// Builder for [`DecisionEngine`]
pub struct EngineBuilder {
    node: NodeId,
    geometry: ConstellationGeometry,
    strategy: Strategy,
    policy: Option<Arc<dyn PolicyOracle>>,
    ground: Arc<GroundAttachments>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn PolicyOracle>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn ground(mut self, ground: Arc<GroundAttachments>) -> Self {
        self.ground = ground;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve the neighbor table from the global link list and assemble the engine
    pub fn build(
        self,
        edges: &[(NodeId, NodeId)],
        table: StaticRoutingTable,
    ) -> RoutingResult<DecisionEngine> {
        let neighbors = NeighborTable::from_edges(self.node, &self.geometry, edges)?;
        if self.strategy == Strategy::AdaptivePolicy && self.policy.is_none() {
            return Err(RoutingError::MissingPolicy(self.node));
        }

        let seed = self.config.seed ^ u64::from(self.node.0).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Ok(DecisionEngine {
            node: self.node,
            geometry: self.geometry,
            neighbors,
            table,
            ground: self.ground,
            strategy: self.strategy,
            policy: self.policy,
            cache: ActionCache::new(self.config.gather_period()),
            ledger: RewardLedger::new(),
            rng: StdRng::seed_from_u64(seed),
            inbox: VecDeque::new(),
            snapshots: NeighborSnapshots::default(),
            occupancy: QueueOccupancy::default(),
            link_geometry: [(0.0, 0.0); 4],
            link_states: [LinkState::Up; 4],
            traffic_mark: TrafficCounters::default(),
            period_traffic: TrafficCounters::default(),
            installed: false,
            policy_queries: 0,
            stats: EngineStats::default(),
            config: self.config,
        })
    }
}

pub struct DecisionEngine {
    node: NodeId,
    geometry: ConstellationGeometry,
    neighbors: NeighborTable,
    table: StaticRoutingTable,
    ground: Arc<GroundAttachments>,
    strategy: Strategy,
    policy: Option<Arc<dyn PolicyOracle>>,
    config: EngineConfig,
    cache: ActionCache,
    ledger: RewardLedger,
    rng: StdRng,
    inbox: VecDeque<RewardMessage>,
    snapshots: NeighborSnapshots,
    occupancy: QueueOccupancy,
    /// (distance km, relative speed km/s) per direction, from the last recomputation
    link_geometry: [(f64, f64); 4],
    /// Last state reported by the fault injector
    link_states: [LinkState; 4],
    traffic_mark: TrafficCounters,
    period_traffic: TrafficCounters,
    installed: bool,
    policy_queries: u64,
    stats: EngineStats,
}

impl DecisionEngine {
    pub fn builder(node: NodeId, geometry: ConstellationGeometry) -> EngineBuilder {
        EngineBuilder {
            node,
            geometry,
            strategy: Strategy::AdaptivePolicy,
            policy: None,
            ground: Arc::new(GroundAttachments::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn cache(&self) -> &ActionCache {
        &self.cache
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn snapshots(&self) -> &NeighborSnapshots {
        &self.snapshots
    }

    pub fn link_states(&self) -> [LinkState; 4] {
        self.link_states
    }

    /// Total policy queries issued
    pub fn policy_queries(&self) -> u64 {
        self.policy_queries
    }

    /// Distinct masks ever sent to the policy
    pub fn distinct_masks(&self) -> usize {
        self.ledger.mask_count()
    }

    /// Textual dump of the static routing table
    pub fn string_repr_of_forwarding_state(&self) -> String {
        self.table.to_string()
    }

    /// Resolve the next hop for a packet
    #[instrument(level = "debug", skip_all, fields(node = %self.node, packet_id = %request.tag.id))]
    pub fn route(
        &mut self,
        request: &RouteRequest,
        view: &dyn ConstellationView,
        now: SimTime,
    ) -> RoutingResult<RouteDecision> {
        let destination_is_ground = !self.geometry.is_satellite(request.destination);
        let target = self.serving_satellite(request.destination)?;

        if destination_is_ground && target == self.node && !request.is_gossip {
            self.stats.ground_deliveries += 1;
            trace!(terminal = %request.destination, "delivering to ground");
            return Ok(RouteDecision::DeliverToGround {
                terminal: request.destination,
            });
        }

        let source_is_ground = !self.geometry.is_satellite(request.source);
        let read_directly = !(source_is_ground && destination_is_ground);
        let forward = self.decide(self.strategy, request, target, read_directly, view, now)?;
        Ok(RouteDecision::Forward(forward))
    }

    fn serving_satellite(&self, node: NodeId) -> RoutingResult<NodeId> {
        if self.geometry.is_satellite(node) {
            return Ok(node);
        }
        self.ground
            .get(&node)
            .copied()
            .ok_or_else(|| TopologyError::UnattachedTerminal(node).into())
    }

    fn poll_links(&self, view: &dyn ConstellationView) -> [LinkSnapshot; 4] {
        Direction::ALL.map(|d| view.link(self.node, d))
    }

    fn direction_to(&self, next_hop: NodeId) -> RoutingResult<Direction> {
        self.neighbors.direction_of(next_hop).ok_or_else(|| {
            TopologyError::NextHopNotNeighbor {
                node: self.node,
                next_hop,
            }
            .into()
        })
    }

    /// The shared decision skeleton; `strategy` selects the tie-break and tag update.
    fn decide(
        &mut self,
        strategy: Strategy,
        request: &RouteRequest,
        target: NodeId,
        read_directly: bool,
        view: &dyn ConstellationView,
        now: SimTime,
    ) -> RoutingResult<Forward> {
        if read_directly {
            let next_hop = self.table.first_candidate(target)?;
            let direction = self.direction_to(next_hop)?;
            self.stats.direct_reads += 1;
            return Ok(Forward {
                next_hop,
                direction,
                outcome: None,
                tag: request.tag,
                rewards: Vec::new(),
            });
        }

        let node = self.node;
        let no_route = move || TopologyError::NoRoute {
            node,
            destination: target,
        };
        let mut approach = DirectionSet::EMPTY;
        for &hop in self.table.candidates(target).ok_or_else(no_route)? {
            approach.insert(self.direction_to(hop)?);
        }

        let arrived_from = request
            .tag
            .last_node
            .and_then(|n| self.neighbors.direction_of(n));
        let links = self.poll_links(view);
        self.occupancy.sample(&links);
        let candidates = classify(approach, arrived_from, &links);
        if candidates.is_tie() {
            self.stats.ties += 1;
        }

        let (direction, outcome) = match strategy {
            Strategy::StaticMetric(metric) => {
                let chosen = if candidates.is_tie() {
                    break_tie(metric, candidates.feasible, &links)
                } else {
                    candidates.feasible.first()
                };
                (chosen.ok_or_else(no_route)?, candidates.outcome)
            }
            Strategy::AdaptivePolicy => {
                self.adaptive_choice(&candidates, &links, request, target, view, now)?
            }
        };

        let next_hop = self.neighbors.neighbor(direction);
        let (tag, rewards) = match strategy {
            Strategy::StaticMetric(_) => (advance_loop_fields(&request.tag, self.node), Vec::new()),
            Strategy::AdaptivePolicy => {
                let quality = links[direction.index()].quality_sample();
                let (tag, rewards) = advance_tag(&request.tag, self.node, now, quality, outcome);
                if self.is_training() {
                    (tag, rewards)
                } else {
                    (tag, Vec::new())
                }
            }
        };

        self.stats.decisions += 1;
        self.stats.rewards_emitted += rewards.len() as u64;
        match outcome {
            DecisionOutcome::Approaching => {}
            DecisionOutcome::Away => self.stats.away += 1,
            DecisionOutcome::Drop => self.stats.drops += 1,
        }
        debug!(
            next_hop = %next_hop,
            direction = %direction,
            outcome = %outcome,
            feasible = candidates.feasible.len(),
            rewards = rewards.len(),
            "forwarding decision"
        );

        Ok(Forward {
            next_hop,
            direction,
            outcome: Some(outcome),
            tag,
            rewards,
        })
    }

    fn is_training(&self) -> bool {
        self.policy.as_ref().is_some_and(|p| p.is_training())
    }

    fn adaptive_choice(
        &mut self,
        candidates: &Candidates,
        links: &[LinkSnapshot; 4],
        request: &RouteRequest,
        target: NodeId,
        view: &dyn ConstellationView,
        now: SimTime,
    ) -> RoutingResult<(Direction, DecisionOutcome)> {
        let fallback = candidates.feasible.first().ok_or(TopologyError::NoRoute {
            node: self.node,
            destination: target,
        })?;
        if !candidates.is_tie() {
            return Ok((fallback, candidates.outcome));
        }

        let policy = self.policy.clone().ok_or(RoutingError::MissingPolicy(self.node))?;
        let direction = if !policy.is_ready() {
            self.stats.not_ready_fallbacks += 1;
            warn!(node = %self.node, "policy not ready, using static table order");
            self.first_in_table_order(target, candidates.feasible)
                .unwrap_or(fallback)
        } else {
            let key = MaskKey::new(candidates.approach, candidates.feasible);
            let probabilities = match self.cache.fresh(&key, now) {
                Some(p) => p,
                None => self.refresh_mask(policy.as_ref(), &key, links, view, now)?,
            };
            let draw: f64 = self.rng.random();
            let sampled = sample_direction(&probabilities, draw);
            let direction = if candidates.feasible.contains(sampled) {
                sampled
            } else {
                most_probable(&probabilities, candidates.feasible).unwrap_or(fallback)
            };
            trace!(mask = %key, draw, sampled = %sampled, chosen = %direction, "policy sample");

            let remaining = self.geometry.remaining_hops(self.node, target);
            if remaining >= 2 && !request.is_gossip && policy.is_training() {
                self.ledger.record_pending(request.tag.id, key);
            }
            direction
        };

        // only a contested choice can be steered into a full queue
        let outcome = if links[direction.index()].would_overflow() {
            DecisionOutcome::Drop
        } else {
            candidates.outcome
        };
        Ok((direction, outcome))
    }

    fn first_in_table_order(&self, target: NodeId, feasible: DirectionSet) -> Option<Direction> {
        self.table
            .candidates(target)?
            .iter()
            .filter_map(|&hop| self.neighbors.direction_of(hop))
            .find(|d| feasible.contains(*d))
    }

    /// Query the policy for a stale or unseen mask and restart its feedback window
    fn refresh_mask(
        &mut self,
        policy: &dyn PolicyOracle,
        key: &MaskKey,
        links: &[LinkSnapshot; 4],
        view: &dyn ConstellationView,
        now: SimTime,
    ) -> RoutingResult<[f64; 4]> {
        let first_seen = !self.cache.contains(key);
        let observation = Observation {
            node: self.node,
            reward: self.ledger.average_reward(key),
            neighbors: self.neighbors.ids(),
            mask: key.digits(),
            own: self.compose_features(links, view, now),
            neighbor_features: self.snapshots.all(),
        };

        let probabilities = policy.query(&observation)?;
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0)
            || probabilities.iter().sum::<f64>() <= 0.0
        {
            return Err(PolicyError::InvalidProbabilities(probabilities).into());
        }

        // the feedback window closes only once a fresh vector is in hand
        let reward = self.ledger.refresh(key);
        self.cache.store(key.clone(), probabilities, now);
        self.policy_queries += 1;
        debug!(mask = %key, reward, first_seen, ?probabilities, "policy queried");
        Ok(probabilities)
    }

    /// Queue a reward addressed to this satellite
    pub fn enqueue_reward(&mut self, message: RewardMessage) {
        self.inbox.push_back(message);
    }

    /// Apply every queued reward. Returns how many were credited.
    pub fn process_inbox(&mut self) -> RoutingResult<usize> {
        let mut applied = 0;
        while let Some(message) = self.inbox.pop_front() {
            let reward = compute_reward(&self.config.reward, message.outcome, message.intervals);
            match self.ledger.credit(message.packet_id, reward) {
                Ok(Credit::Applied) => {
                    applied += 1;
                    self.stats.rewards_applied += 1;
                    trace!(packet_id = %message.packet_id, reward, "reward credited");
                }
                Ok(Credit::Expired) => self.stats.rewards_expired += 1,
                Err(mask) => {
                    return Err(RoutingError::UnknownMask {
                        node: self.node,
                        mask: mask.to_string(),
                    });
                }
            }
        }
        Ok(applied)
    }

    pub fn pending_rewards(&self) -> usize {
        self.inbox.len()
    }

    fn compose_features(
        &self,
        links: &[LinkSnapshot; 4],
        view: &dyn ConstellationView,
        now: SimTime,
    ) -> FeatureVector {
        let mut positions = [GeoPosition::default(); 5];
        positions[0] = view.position(self.node);
        for direction in Direction::ALL {
            positions[direction.index() + 1] = view.position(self.neighbors.neighbor(direction));
        }
        compose_features(&FeatureInputs {
            positions,
            links,
            geometry: &self.link_geometry,
            occupancy: &self.occupancy,
            period_traffic: &self.period_traffic,
            neighbors: &self.snapshots,
            busyness: self.cache.busyness(now),
        })
    }

    /// Build this satellite's link-state broadcast, one message per neighbor
    pub fn compose_gossip(&mut self, view: &dyn ConstellationView, now: SimTime) -> Vec<GossipMessage> {
        let links = self.poll_links(view);
        let features = self.compose_features(&links, view, now);
        self.stats.gossip_sent += 4;
        self.neighbors
            .ids()
            .into_iter()
            .map(|neighbor| GossipMessage {
                tag: GossipTag::new(self.node, neighbor),
                features: features.clone(),
            })
            .collect()
    }

    /// Store a neighbor's broadcast. Returns false if it was not for us
    /// or came from a satellite that is not a neighbor.
    pub fn receive_gossip(&mut self, message: &GossipMessage) -> bool {
        if message.tag.target != self.node {
            self.stats.gossip_ignored += 1;
            return false;
        }
        match self.neighbors.direction_of(message.tag.source) {
            Some(direction) => {
                self.snapshots.store(direction, message.features.clone());
                self.stats.gossip_received += 1;
                true
            }
            None => {
                self.stats.gossip_ignored += 1;
                warn!(node = %self.node, source = %message.tag.source, "gossip from non-neighbor");
                false
            }
        }
    }

    /// Note a link flip. Decisions keep reading live link state.
    pub fn on_link_state_change(&mut self, direction: Direction, state: LinkState) {
        self.link_states[direction.index()] = state;
        self.stats.link_flips += 1;
        debug!(node = %self.node, direction = %direction, ?state, "link state changed");
    }

    /// Resolve neighbor link handles and return the initial periodic schedule.
    ///
    /// Must run after the topology is stable.
    pub fn record_interfaces(&mut self, view: &dyn ConstellationView) -> Vec<(PeriodicTask, Duration)> {
        self.recalculate_distance(view);
        self.traffic_mark = view.traffic(self.node);
        self.installed = true;
        debug!(node = %self.node, neighbors = ?self.neighbors.ids(), "interfaces recorded");
        vec![
            (PeriodicTask::BroadcastLinkState, self.config.first_broadcast()),
            (PeriodicTask::ResetQueueLength, self.config.queue_reset_period()),
            (PeriodicTask::UpdatePacketCount, self.config.counter_period()),
            (PeriodicTask::RecalculateDistance, self.config.gather_period()),
        ]
    }

    pub fn run_periodic(
        &mut self,
        task: PeriodicTask,
        view: &dyn ConstellationView,
        now: SimTime,
    ) -> RoutingResult<PeriodicOutput> {
        if !self.installed {
            return Err(RoutingError::NotInstalled(self.node));
        }
        let output = match task {
            PeriodicTask::BroadcastLinkState => PeriodicOutput {
                next_in: self.config.broadcast_period(),
                gossip: self.compose_gossip(view, now),
            },
            PeriodicTask::ResetQueueLength => {
                self.occupancy.reset();
                PeriodicOutput {
                    next_in: self.config.queue_reset_period(),
                    gossip: Vec::new(),
                }
            }
            PeriodicTask::UpdatePacketCount => {
                let totals = view.traffic(self.node);
                self.period_traffic = totals.delta_since(&self.traffic_mark);
                self.traffic_mark = totals;
                PeriodicOutput {
                    next_in: self.config.counter_period(),
                    gossip: Vec::new(),
                }
            }
            PeriodicTask::RecalculateDistance => {
                self.recalculate_distance(view);
                PeriodicOutput {
                    next_in: self.config.gather_period(),
                    gossip: Vec::new(),
                }
            }
        };
        Ok(output)
    }

    fn recalculate_distance(&mut self, view: &dyn ConstellationView) {
        for direction in Direction::ALL {
            let link = view.link(self.node, direction);
            self.link_geometry[direction.index()] = (link.distance_km, link.relative_speed);
        }
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("node", &self.node)
            .field("strategy", &self.strategy)
            .field("cached_masks", &self.cache.len())
            .field("policy_queries", &self.policy_queries)
            .finish_non_exhaustive()
    }
}
