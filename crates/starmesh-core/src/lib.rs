//! # Starmesh Core
//!
//! Core types, wire records, and collaborator traits shared by the
//! per-satellite forwarding engine and the simulation that drives it.
//!
//! ## Key Types
//!
//! - [`NodeId`] / [`Direction`]: satellite identity and the four inter-satellite link slots
//! - [`ConstellationGeometry`]: orbit/phase arithmetic over a Walker-style torus
//! - [`RoutingTag`]: per-packet metadata carried hop by hop (44-byte wire layout)
//! - [`GossipTag`]: source/target header of a link-state broadcast (8 bytes)
//! - [`FeatureVector`]: the per-node observation gossiped to neighbors
//! - [`RewardMessage`]: delayed credit addressed to an earlier satellite
//!
//! ## Key Traits
//!
//! - [`ConstellationView`]: read-only access to link, position, and traffic state
//! - [`PolicyOracle`]: the external learned policy queried on adaptive tie-breaks

pub mod error;
pub mod features;
pub mod geometry;
pub mod identity;
pub mod link;
pub mod reward;
pub mod tag;
pub mod testing;
pub mod time;
pub mod traits;

pub use error::*;
pub use features::*;
pub use geometry::*;
pub use identity::*;
pub use link::*;
pub use reward::*;
pub use tag::*;
pub use time::*;
pub use traits::*;
