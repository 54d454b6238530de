//! Discrete event driver
//!
//! Owns the constellation, the link model and one [`DecisionEngine`] per
//! satellite, and moves packets, rewards and gossip between them in
//! simulated time.

use std::collections::{BTreeSet, BinaryHeap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use starmesh_core::{
    Direction, LinkState, NodeId, PacketIdCounter, PolicyOracle, RewardMessage, RoutingTag,
    SimTime, TopologyError,
};
use starmesh_logging::NodeContextGuard;
use starmesh_routing::{
    DecisionEngine, GossipMessage, PeriodicTask, RouteDecision, RouteRequest, StaticRoutingTable,
    Strategy,
};
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::event::{Event, Packet, ScheduledEvent, SequenceNumber};
use crate::links::{LinkModel, TransmitError};
use crate::policy::ScriptedPolicy;
use crate::stats::{SimReport, SimStats};
use crate::topology::{Constellation, ConstellationBuilder};

/// The simulation state
pub struct Simulation {
    config: SimConfig,
    constellation: Constellation,
    links: LinkModel,
    /// Indexed by satellite id
    engines: Vec<DecisionEngine>,
    policy: Option<Arc<ScriptedPolicy>>,
    /// (source terminal, destination terminal)
    flows: Vec<(NodeId, NodeId)>,
    event_queue: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
    now: SimTime,
    rng: StdRng,
    packet_ids: PacketIdCounter,
    run_id: Uuid,
    pub stats: SimStats,
}

impl Simulation {
    /// Build the constellation, install an engine on every satellite and
    /// schedule the initial events.
    ///
    /// Installation is all-or-nothing: any satellite that cannot be set up
    /// aborts the run.
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        if config.ground_terminals < 2 {
            return Err(SimError::NotEnoughTerminals(config.ground_terminals).into());
        }

        let constellation = ConstellationBuilder::new(config.num_orbits, config.sats_per_orbit)
            .with_ground_terminals(config.ground_terminals)
            .torus();
        let links = LinkModel::new(&constellation, config.links.clone())
            .context("building link model")?;

        let policy = (config.strategy == Strategy::AdaptivePolicy).then(|| {
            let p = &config.policy;
            Arc::new(if p.warmup_ms > 0 {
                ScriptedPolicy::warming_up(p.kind, p.training)
            } else {
                ScriptedPolicy::new(p.kind, p.training)
            })
        });

        let mut tables = constellation.static_tables();
        let mut engines = Vec::with_capacity(constellation.satellite_count());
        for sat in constellation.satellites() {
            let table = tables
                .remove(&sat)
                .unwrap_or_else(|| StaticRoutingTable::new(sat, Default::default()));
            let mut builder = DecisionEngine::builder(sat, constellation.geometry)
                .strategy(config.strategy)
                .ground(Arc::clone(&constellation.ground))
                .config(config.engine.clone());
            if let Some(policy) = &policy {
                builder = builder.policy(Arc::clone(policy) as Arc<dyn PolicyOracle>);
            }
            let engine = builder
                .build(&constellation.edges, table)
                .with_context(|| format!("installing engine on satellite {sat}"))?;
            engines.push(engine);
        }

        let terminals: Vec<NodeId> = constellation.terminals().collect();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let flows = if config.traffic.pairs.is_empty() {
            (0..config.traffic.flows)
                .map(|_| {
                    let src = rng.random_range(0..terminals.len());
                    let dst = (src + rng.random_range(1..terminals.len())) % terminals.len();
                    (terminals[src], terminals[dst])
                })
                .collect()
        } else {
            let terminal = |index: u32| {
                terminals
                    .get(index as usize)
                    .copied()
                    .ok_or(SimError::UnknownTerminal {
                        index,
                        available: terminals.len() as u32,
                    })
            };
            config
                .traffic
                .pairs
                .iter()
                .map(|&(src, dst)| Ok((terminal(src)?, terminal(dst)?)))
                .collect::<SimResult<Vec<_>>>()?
        };

        let mut sim = Self {
            config,
            constellation,
            links,
            engines,
            policy,
            flows,
            event_queue: BinaryHeap::new(),
            next_seq: 0,
            now: SimTime::ZERO,
            rng,
            packet_ids: PacketIdCounter::new(),
            run_id: Uuid::new_v4(),
            stats: SimStats::default(),
        };
        sim.install();
        Ok(sim)
    }

    /// Record interfaces on every engine once the topology is stable and
    /// seed the event queue.
    fn install(&mut self) {
        let mut initial = Vec::new();
        for engine in &mut self.engines {
            for (task, delay) in engine.record_interfaces(&self.links) {
                initial.push((SimTime::ZERO + delay, engine.node(), task));
            }
        }
        for (time, node, task) in initial {
            self.schedule(time, Event::Periodic { node, task });
        }

        for flow in 0..self.flows.len() {
            let gap = self.interarrival();
            self.schedule(SimTime::ZERO + gap, Event::Generate { flow });
        }
        self.schedule(SimTime::ZERO + self.config.links.update_period(), Event::ChannelUpdate);
        if self.policy.is_some() && self.config.policy.warmup_ms > 0 {
            self.schedule(SimTime::from_millis(self.config.policy.warmup_ms), Event::PolicyReady);
        }

        info!(
            run_id = %self.run_id,
            satellites = self.engines.len(),
            flows = self.flows.len(),
            strategy = %self.config.strategy,
            "constellation installed"
        );
    }

    pub fn schedule(&mut self, time: SimTime, event: Event) {
        let seq = SequenceNumber::new(self.next_seq);
        self.next_seq += 1;
        self.event_queue.push(ScheduledEvent::new(time, seq, event));
    }

    fn interarrival(&mut self) -> Duration {
        let rate = self.config.traffic.packets_per_second.max(1e-3);
        let u: f64 = self.rng.random();
        Duration::from_secs_f64(-(1.0 - u).ln() / rate)
    }

    /// Run for the configured duration and report
    pub fn run(&mut self) -> SimResult<SimReport> {
        let end = SimTime::ZERO + self.config.duration();
        self.run_until(end)?;
        Ok(self.report())
    }

    /// Process every event scheduled at or before `end`
    pub fn run_until(&mut self, end: SimTime) -> SimResult<()> {
        while let Some(next) = self.event_queue.peek() {
            if next.time > end {
                break;
            }
            let Some(scheduled) = self.event_queue.pop() else {
                break;
            };
            self.now = scheduled.time;
            self.handle(scheduled.event)?;
        }
        self.now = self.now.max(end);
        Ok(())
    }

    fn handle(&mut self, event: Event) -> SimResult<()> {
        match event {
            Event::Generate { flow } => self.generate(flow),
            Event::Arrive { node, packet, via } => self.arrive(node, packet, via),
            Event::TransmitDone {
                node,
                direction,
                packet,
            } => {
                self.transmit_done(node, direction, packet);
                Ok(())
            }
            Event::Periodic { node, task } => self.periodic(node, task),
            Event::Gossip { to, payload } => self.gossip(to, &payload),
            Event::ChannelUpdate => {
                self.channel_update();
                Ok(())
            }
            Event::PolicyReady => {
                if let Some(policy) = &self.policy {
                    policy.set_ready(true);
                    info!(at = %self.now, "policy ready");
                }
                Ok(())
            }
        }
    }

    fn generate(&mut self, flow: usize) -> SimResult<()> {
        let Some(&(source, destination)) = self.flows.get(flow) else {
            return Ok(());
        };
        let serving = self
            .constellation
            .ground
            .get(&source)
            .copied()
            .ok_or(TopologyError::UnattachedTerminal(source))?;

        let id = self.packet_ids.next_id();
        let packet = Packet {
            source,
            destination,
            created: self.now,
            size_bytes: self.config.traffic.packet_size_bytes,
            tag: RoutingTag::new(id, self.now).encode(),
        };
        self.stats.packets_generated += 1;
        trace!(packet_id = %id, %source, %destination, "packet generated");

        let uplink = self.now + self.links.ground_delay();
        self.schedule(
            uplink,
            Event::Arrive {
                node: serving,
                packet,
                via: None,
            },
        );
        let next = self.now + self.interarrival();
        self.schedule(next, Event::Generate { flow });
        Ok(())
    }

    fn arrive(&mut self, node: NodeId, packet: Packet, via: Option<Direction>) -> SimResult<()> {
        let _ctx = NodeContextGuard::new(node, self.now, self.run_id);
        match via {
            Some(direction) => self.links.record_isl_arrival(node, direction),
            None => self.links.record_uplink(node),
        }

        let tag = RoutingTag::decode(&packet.tag)?;
        if tag.hops >= self.config.max_hops {
            self.stats.dropped_hop_limit += 1;
            debug!(packet_id = %tag.id, hops = tag.hops, "hop limit reached");
            return Ok(());
        }

        let request = RouteRequest {
            source: packet.source,
            destination: packet.destination,
            tag,
            is_gossip: false,
        };
        let engine = self
            .engines
            .get_mut(node.0 as usize)
            .ok_or(SimError::MissingEngine(node))?;
        let decision = engine.route(&request, &self.links, self.now)?;

        match decision {
            RouteDecision::DeliverToGround { terminal } => {
                self.links.record_downlink(node);
                let delivered_at = self.now + self.links.ground_delay();
                self.stats.packets_delivered += 1;
                self.stats.total_hops += u64::from(request.tag.hops);
                self.stats.total_latency_us += delivered_at.since(packet.created).as_micros() as u64;
                trace!(packet_id = %request.tag.id, %terminal, "delivered");
            }
            RouteDecision::Forward(forward) => {
                self.route_rewards(forward.rewards)?;
                let packet = Packet {
                    tag: forward.tag.encode(),
                    ..packet
                };
                match self
                    .links
                    .enqueue(self.now, node, forward.direction, packet.size_bytes)
                {
                    Ok(done) => self.schedule(
                        done,
                        Event::TransmitDone {
                            node,
                            direction: forward.direction,
                            packet,
                        },
                    ),
                    Err(TransmitError::LinkDown) => self.stats.dropped_link_down += 1,
                    Err(TransmitError::QueueFull) => self.stats.dropped_queue_full += 1,
                }
            }
        }
        Ok(())
    }

    /// Hand rewards to their target satellites and credit them on this tick
    fn route_rewards(&mut self, rewards: Vec<RewardMessage>) -> SimResult<()> {
        let mut touched = BTreeSet::new();
        for message in rewards {
            let to = message.to;
            let engine = self
                .engines
                .get_mut(to.0 as usize)
                .ok_or(SimError::MissingEngine(to))?;
            engine.enqueue_reward(message);
            touched.insert(to);
            self.stats.rewards_routed += 1;
        }
        for node in touched {
            if let Some(engine) = self.engines.get_mut(node.0 as usize) {
                engine.process_inbox()?;
            }
        }
        Ok(())
    }

    fn transmit_done(&mut self, node: NodeId, direction: Direction, packet: Packet) {
        match self.links.dequeue(node, direction) {
            Ok((peer, delay)) => {
                let arrival = self.now + delay;
                self.schedule(
                    arrival,
                    Event::Arrive {
                        node: peer,
                        packet,
                        via: Some(direction.opposite()),
                    },
                );
            }
            Err(_) => self.stats.dropped_link_down += 1,
        }
    }

    fn periodic(&mut self, node: NodeId, task: PeriodicTask) -> SimResult<()> {
        let _ctx = NodeContextGuard::new(node, self.now, self.run_id);
        let engine = self
            .engines
            .get_mut(node.0 as usize)
            .ok_or(SimError::MissingEngine(node))?;
        let output = engine.run_periodic(task, &self.links, self.now)?;
        let outgoing: Vec<(Option<Direction>, GossipMessage)> = output
            .gossip
            .into_iter()
            .map(|m| (engine.neighbors().direction_of(m.tag.target), m))
            .collect();

        let next = self.now + output.next_in;
        self.schedule(next, Event::Periodic { node, task });

        for (direction, message) in outgoing {
            let Some(direction) = direction else {
                self.stats.gossip_lost += 1;
                continue;
            };
            if self.links.link_state(node, direction) == LinkState::Down {
                self.stats.gossip_lost += 1;
                continue;
            }
            let payload = message.encode()?;
            let arrival = self.now + self.links.propagation(node, direction);
            self.schedule(
                arrival,
                Event::Gossip {
                    to: message.tag.target,
                    payload,
                },
            );
        }
        Ok(())
    }

    fn gossip(&mut self, to: NodeId, payload: &[u8]) -> SimResult<()> {
        let message = GossipMessage::decode(payload)?;
        let engine = self
            .engines
            .get_mut(to.0 as usize)
            .ok_or(SimError::MissingEngine(to))?;
        if engine.receive_gossip(&message) {
            self.stats.gossip_delivered += 1;
        }
        Ok(())
    }

    fn channel_update(&mut self) {
        self.links.update_geometry(self.now);
        let flips = self.links.inject_faults(&mut self.rng);
        self.notify_flips(&flips);
        let next = self.now + self.config.links.update_period();
        self.schedule(next, Event::ChannelUpdate);
    }

    fn notify_flips(&mut self, flips: &[crate::links::LinkFlip]) {
        for flip in flips {
            if let Some(engine) = self.engines.get_mut(flip.node.0 as usize) {
                engine.on_link_state_change(flip.direction, flip.state);
            }
        }
        self.stats.link_flips += flips.len() as u64 / 2;
    }

    /// Force a link (both ends) into `state` and notify the engines
    pub fn set_link_state(&mut self, node: NodeId, direction: Direction, state: LinkState) {
        let flips = self.links.set_state(node, direction, state);
        self.notify_flips(&flips);
    }

    /// Snapshot of the run so far
    pub fn report(&self) -> SimReport {
        let mut report = SimReport::new(self.config.strategy, self.config.seed, self.config.duration_ms);
        let mut network = self.stats.clone();
        network.in_flight = network
            .packets_generated
            .saturating_sub(network.packets_delivered + network.dropped());
        report.network = network;
        for engine in &self.engines {
            report
                .engines
                .add(engine.stats(), engine.policy_queries(), engine.distinct_masks());
        }
        report.oracle = self.policy.as_ref().map(|p| p.stats());
        report
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn constellation(&self) -> &Constellation {
        &self.constellation
    }

    pub fn links(&self) -> &LinkModel {
        &self.links
    }

    pub fn engine(&self, node: NodeId) -> Option<&DecisionEngine> {
        self.engines.get(node.0 as usize)
    }

    pub fn flows(&self) -> &[(NodeId, NodeId)] {
        &self.flows
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("run_id", &self.run_id)
            .field("now", &self.now)
            .field("satellites", &self.engines.len())
            .field("pending_events", &self.event_queue.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
