//! Scripted policy oracles
//!
//! Stand-ins for the external learning agent. They answer every query from
//! the observation alone and keep running totals of what they were told.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use starmesh_core::{Observation, PolicyError, PolicyOracle};

/// Which scripted behavior answers queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Equal weight on every feasible direction
    Uniform,
    /// Favors short queues and strong channels, discounts away directions
    #[default]
    QueueAware,
}

/// Weight given to a feasible direction that moves away from the destination
const AWAY_DISCOUNT: f64 = 0.25;
const WEIGHT_FLOOR: f64 = 0.05;

#[derive(Debug, Default)]
struct OracleState {
    ready: bool,
    queries: u64,
    reward_sum: f64,
    reward_count: u64,
}

/// Summary of what an oracle has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OracleStats {
    pub queries: u64,
    pub rewards_reported: u64,
    pub mean_reward: f64,
}

#[derive(Debug)]
pub struct ScriptedPolicy {
    kind: PolicyKind,
    training: bool,
    state: Mutex<OracleState>,
}

impl ScriptedPolicy {
    pub fn new(kind: PolicyKind, training: bool) -> Self {
        Self {
            kind,
            training,
            state: Mutex::new(OracleState {
                ready: true,
                ..Default::default()
            }),
        }
    }

    /// An oracle that stays not-ready until [`set_ready`](Self::set_ready)
    pub fn warming_up(kind: PolicyKind, training: bool) -> Self {
        let policy = Self::new(kind, training);
        policy.set_ready(false);
        policy
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn stats(&self) -> OracleStats {
        let state = self.state.lock();
        OracleStats {
            queries: state.queries,
            rewards_reported: state.reward_count,
            mean_reward: if state.reward_count == 0 {
                0.0
            } else {
                state.reward_sum / state.reward_count as f64
            },
        }
    }

    fn weights(&self, observation: &Observation) -> [f64; 4] {
        let own = &observation.own;
        std::array::from_fn(|d| {
            let digit = observation.mask[d];
            if digit < 2 {
                return 0.0;
            }
            let base = match self.kind {
                PolicyKind::Uniform => 1.0,
                PolicyKind::QueueAware => {
                    (1.0 - own.queue_ratio[d]).max(0.0) * own.decay[d] + WEIGHT_FLOOR
                }
            };
            if digit == 3 { base } else { base * AWAY_DISCOUNT }
        })
    }
}

impl PolicyOracle for ScriptedPolicy {
    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn query(&self, observation: &Observation) -> Result<[f64; 4], PolicyError> {
        let mut state = self.state.lock();
        if !state.ready {
            return Err(PolicyError::NotReady);
        }
        state.queries += 1;
        // The first query on a mask carries a zero placeholder reward
        if observation.reward != 0.0 {
            state.reward_sum += observation.reward;
            state.reward_count += 1;
        }
        drop(state);

        let weights = self.weights(observation);
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(PolicyError::QueryFailed(format!(
                "no feasible direction in mask {:?}",
                observation.mask
            )));
        }
        Ok(weights.map(|w| w / total))
    }
}
