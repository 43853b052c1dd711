//! Operator-controlled strategy settings

use candid::CandidType;
use serde::Deserialize;

use crate::{constants::BPS_DENOMINATOR, types::StrategyId};

/// Settings that only change through operator actions
#[derive(Clone, CandidType, Debug, Default, Deserialize, PartialEq)]
pub struct StrategySettings {
    /// Key of the strategy in the registry
    pub key: StrategyId,
    /// Human readable label of the venue
    pub name: String,
    /// Share of each deployment pass routed to this strategy, in basis points
    pub weight_bps: u64,
    /// Inactive strategies are skipped by the NAV aggregator and the rebalancer
    pub active: bool,
}

impl StrategySettings {
    /// Sets the key for the strategy.
    pub fn key(&mut self, key: StrategyId) -> &mut Self {
        self.key = key;
        self
    }

    /// Sets the label for the strategy.
    pub fn name<S: AsRef<str>>(&mut self, name: S) -> &mut Self {
        self.name = name.as_ref().to_string();
        self
    }

    /// Sets the deployment weight, in basis points.
    pub fn weight_bps(&mut self, weight_bps: u64) -> &mut Self {
        self.weight_bps = weight_bps;
        self
    }

    /// Sets the active flag.
    pub fn active(&mut self, active: bool) -> &mut Self {
        self.active = active;
        self
    }

    /// Returns `true` if the strategy takes part in deployment passes
    pub fn is_deployable(&self) -> bool {
        self.active && self.weight_bps > 0
    }

    /// Returns `true` if the weight fits in 100%
    pub fn has_valid_weight(&self) -> bool {
        self.weight_bps <= BPS_DENOMINATOR
    }
}
