//! # Starmesh Routing
//!
//! Per-satellite forwarding decision engine for a LEO mesh.
//!
//! Each satellite runs one [`DecisionEngine`]. For every packet that is not
//! for a local ground terminal it picks one of the four inter-satellite
//! links, under one of two strategies:
//!
//! - [`Strategy::StaticMetric`]: deterministic; ties between equally short
//!   paths are broken by distance, queue occupancy, or bandwidth
//! - [`Strategy::AdaptivePolicy`]: ties are broken by sampling a probability
//!   vector from an external policy, cached per decision context for one
//!   epoch, and the resulting decisions earn delayed reward credit carried
//!   back through the packet's [`RoutingTag`](starmesh_core::RoutingTag)
//!
//! ## Modules
//!
//! - [`neighbors`]: four-slot neighbor table built from global links
//! - [`table`]: static shortest-path candidates per destination
//! - [`decision`]: approach/away classification and selection tiers
//! - [`metric`]: static physical-metric tie-break
//! - [`cache`]: action cache and probability sampling
//! - [`reward`]: reward formula and per-mask ledger
//! - [`chain`]: hop-by-hop tag advancement and reward emission
//! - [`gossip`]: link-state broadcast and neighbor snapshots

pub mod cache;
pub mod chain;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod gossip;
pub mod mask;
pub mod metric;
pub mod neighbors;
pub mod reward;
pub mod table;

pub use cache::{ActionCache, sample_direction};
pub use config::EngineConfig;
pub use decision::{Candidates, MetricKind, Strategy, Tier, classify};
pub use engine::{
    DecisionEngine, EngineBuilder, EngineStats, Forward, GroundAttachments, PeriodicOutput,
    PeriodicTask, RouteDecision, RouteRequest,
};
pub use error::{RoutingError, RoutingResult};
pub use gossip::{GossipMessage, NeighborSnapshots};
pub use mask::MaskKey;
pub use neighbors::NeighborTable;
pub use reward::{Accumulator, Credit, RewardLedger, RewardParams, compute_reward};
pub use table::StaticRoutingTable;
