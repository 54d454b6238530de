//! Satellite context injection
//!
//! Thread-local storage for the satellite whose event is being processed
//! and the simulated time of that event, so every log line emitted while
//! handling it can be attributed without threading ids through each call.

use std::cell::RefCell;

use starmesh_core::{NodeId, SimTime};
use uuid::Uuid;

/// Context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContextData {
    pub node: NodeId,
    pub sim_time: SimTime,
    /// Identifies the simulation run
    pub run_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for satellite context
///
/// Sets the context for the current thread on creation and restores the
/// previous one when dropped.
///
/// # Example
///
/// ```ignore
/// use starmesh_logging::context::NodeContextGuard;
///
/// let _guard = NodeContextGuard::new(NodeId(12), now, run_id);
/// tracing::debug!("forwarding decision");
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    pub fn new(node: NodeId, sim_time: SimTime, run_id: Uuid) -> Self {
        let previous = NODE_CONTEXT.with(|ctx| {
            ctx.borrow_mut().replace(NodeContextData {
                node,
                sim_time,
                run_id,
            })
        });
        Self { previous }
    }

    /// Get the current context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    pub fn current_node() -> Option<NodeId> {
        Self::current().map(|ctx| ctx.node)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
