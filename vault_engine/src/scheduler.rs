//! Deployment scheduler
//!
//! Decides whether idle funds are pushed to the strategies and splits them by weight.
//! A pass moves the scheduler from `Idle` to `Deploying` and back; a second pass can
//! not start while one is running.

use alloy_primitives::U256;
use candid::CandidType;
use serde::Deserialize;

use crate::{
    types::{AssetAmounts, StrategyId},
    utils::{
        common::apply_bps,
        error::{VaultError, VaultResult},
    },
};

#[derive(Clone, Copy, CandidType, Debug, Default, Deserialize, PartialEq, Eq)]
pub enum SchedulerState {
    #[default]
    Idle,
    Deploying,
}

/// Outcome of the trigger check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Ready,
    /// Idle value is below the deployment threshold (or there is nothing to deploy)
    BelowThreshold,
    /// The minimum interval since the last pass has not elapsed
    IntervalNotElapsed { next_at: u64 },
    /// No active strategy has a nonzero weight
    NoDeployableStrategy,
}

impl GateDecision {
    pub fn is_ready(&self) -> bool {
        matches!(self, GateDecision::Ready)
    }
}

/// Inputs of the trigger check
#[derive(Clone, Copy, Debug)]
pub struct GateInput {
    pub idle_value: U256,
    pub threshold: U256,
    pub now: u64,
    pub min_interval: u64,
    pub has_deployable: bool,
    /// Forced passes bypass the interval, nothing else
    pub forced: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeploymentScheduler {
    state: SchedulerState,
    last_deployment_timestamp: u64,
}

impl DeploymentScheduler {
    pub fn new(last_deployment_timestamp: u64) -> Self {
        Self {
            state: SchedulerState::Idle,
            last_deployment_timestamp,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_deployment_timestamp(&self) -> u64 {
        self.last_deployment_timestamp
    }

    pub fn check(&self, input: &GateInput) -> GateDecision {
        if input.idle_value.is_zero() || input.idle_value < input.threshold {
            return GateDecision::BelowThreshold;
        }
        let next_at = self
            .last_deployment_timestamp
            .saturating_add(input.min_interval);
        if !input.forced && input.now < next_at {
            return GateDecision::IntervalNotElapsed { next_at };
        }
        if !input.has_deployable {
            return GateDecision::NoDeployableStrategy;
        }
        GateDecision::Ready
    }

    /// Enters `Deploying`
    pub fn begin(&mut self) -> VaultResult<()> {
        if self.state == SchedulerState::Deploying {
            return Err(VaultError::ReentrantCall);
        }
        self.state = SchedulerState::Deploying;
        Ok(())
    }

    /// Returns to `Idle` and stamps the pass
    pub fn finish(&mut self, now: u64) {
        self.state = SchedulerState::Idle;
        self.last_deployment_timestamp = now;
    }

    /// Returns to `Idle` without stamping, for a pass that moved no funds
    pub fn abort(&mut self) {
        self.state = SchedulerState::Idle;
    }
}

/// Splits `idle` by each strategy's weight. The unweighted remainder stays idle.
pub fn allocate(
    idle: &AssetAmounts,
    weights: &[(StrategyId, u64)],
) -> VaultResult<Vec<(StrategyId, AssetAmounts)>> {
    weights
        .iter()
        .map(|(key, weight_bps)| {
            Ok((
                *key,
                AssetAmounts::new(
                    apply_bps(idle.a, *weight_bps)?,
                    apply_bps(idle.b, *weight_bps)?,
                ),
            ))
        })
        .collect()
}
