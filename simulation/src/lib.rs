//! # Starmesh simulation
//!
//! A discrete-event model of a +Grid LEO constellation that installs one
//! forwarding engine per satellite and drives it with ground traffic, link
//! faults and orbital motion.
//!
//! ## Architecture
//!
//! - **Topology** (`topology.rs`): torus links, ground attachments, shortest-path tables
//! - **Links** (`links.rs`): orbits, transmit queues, fault injection; the engines' view
//! - **Policy** (`policy.rs`): scripted oracles standing in for the learning agent
//! - **Events** (`event.rs`): the time-ordered event queue
//! - **Simulation** (`sim.rs`): installation and the event loop
//!
//! ## Example
//!
//! ```rust,ignore
//! use starmesh_simulation::*;
//!
//! let mut sim = Simulation::new(SimConfig::small().with_seed(7))?;
//! let report = sim.run()?;
//! println!("{report}");
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod links;
pub mod policy;
pub mod sim;
pub mod stats;
pub mod topology;

pub use config::{LinkConfig, PolicyConfig, SimConfig, TrafficConfig};
pub use error::{SimError, SimResult};
pub use links::{LinkFlip, LinkModel, TransmitError};
pub use policy::{OracleStats, PolicyKind, ScriptedPolicy};
pub use sim::Simulation;
pub use stats::{EngineTotals, SimReport, SimStats};
pub use topology::{Constellation, ConstellationBuilder};
