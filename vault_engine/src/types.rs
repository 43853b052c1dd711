//! Core value types shared by the engine's components

use alloy_primitives::U256;
use candid::{CandidType, Nat};
use serde::Deserialize;

use crate::utils::{
    common::{checked_add, checked_sub, u256_to_nat},
    error::{VaultError, VaultResult},
};

/// Key of a strategy in the registry
pub type StrategyId = u32;

/// One of the two fungible assets the vault accepts
#[derive(Clone, Copy, CandidType, Debug, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetId {
    A,
    B,
}

impl AssetId {
    /// Returns the other asset of the pair
    pub fn other(self) -> Self {
        match self {
            AssetId::A => AssetId::B,
            AssetId::B => AssetId::A,
        }
    }
}

/// An amount of each of the two assets.
/// Fields are named so that A and B can never be swapped by position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssetAmounts {
    pub a: U256,
    pub b: U256,
}

impl AssetAmounts {
    pub fn new(a: U256, b: U256) -> Self {
        Self { a, b }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.a.is_zero() && self.b.is_zero()
    }

    /// Returns the amount of `asset`
    pub fn get(&self, asset: AssetId) -> U256 {
        match asset {
            AssetId::A => self.a,
            AssetId::B => self.b,
        }
    }

    /// Mutable access to the amount of `asset`
    pub fn get_mut(&mut self, asset: AssetId) -> &mut U256 {
        match asset {
            AssetId::A => &mut self.a,
            AssetId::B => &mut self.b,
        }
    }

    pub fn checked_add(&self, other: &AssetAmounts) -> VaultResult<AssetAmounts> {
        Ok(AssetAmounts {
            a: checked_add(self.a, other.a, "Asset A amount")?,
            b: checked_add(self.b, other.b, "Asset B amount")?,
        })
    }

    pub fn checked_sub(&self, other: &AssetAmounts) -> VaultResult<AssetAmounts> {
        Ok(AssetAmounts {
            a: checked_sub(self.a, other.a, "Asset A amount")?,
            b: checked_sub(self.b, other.b, "Asset B amount")?,
        })
    }

    /// Component-wise `self - other`, floored at zero
    pub fn saturating_sub(&self, other: &AssetAmounts) -> AssetAmounts {
        AssetAmounts {
            a: self.a.saturating_sub(other.a),
            b: self.b.saturating_sub(other.b),
        }
    }

    /// Returns `true` if both amounts are at least those of `other`
    pub fn covers(&self, other: &AssetAmounts) -> bool {
        self.a >= other.a && self.b >= other.b
    }
}

/// Holding ratio of asset A to asset B reported by a liquidity venue
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ratio {
    pub a: U256,
    pub b: U256,
}

impl Ratio {
    pub fn new(a: U256, b: U256) -> Self {
        Self { a, b }
    }

    /// A venue with no holdings imposes no ratio
    pub fn is_empty(&self) -> bool {
        self.a.is_zero() && self.b.is_zero()
    }
}

/// What a strategy reports back from a deposit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositOutcome {
    /// Amounts the venue actually took
    pub consumed: AssetAmounts,
    /// Amounts handed back to the vault (offered + previously held - consumed)
    pub returned: AssetAmounts,
    /// Position units the venue issued for this deposit
    pub position_units: U256,
}

/// Record of one rebalancer call against one strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeploymentResult {
    pub requested_a: U256,
    pub requested_b: U256,
    /// Loose balance the strategy held before the call
    pub held_a: U256,
    pub held_b: U256,
    /// Swap leg: amount of the excess asset sold and the deficient asset bought
    pub swapped_out_a: U256,
    pub swapped_out_b: U256,
    pub swapped_in_a: U256,
    pub swapped_in_b: U256,
    pub consumed_a: U256,
    pub consumed_b: U256,
    pub returned_a: U256,
    pub returned_b: U256,
    /// Value of the position units received, in the common unit of account
    pub received_position_value: U256,
}

impl DeploymentResult {
    /// Checks that the call neither created nor destroyed tokens:
    /// `requested + held + swapped_in - swapped_out == consumed + returned` for each asset.
    pub fn is_conserved(&self) -> bool {
        let inflow_a = self.requested_a + self.held_a + self.swapped_in_a;
        let inflow_b = self.requested_b + self.held_b + self.swapped_in_b;
        inflow_a == self.consumed_a + self.returned_a + self.swapped_out_a
            && inflow_b == self.consumed_b + self.returned_b + self.swapped_out_b
    }

    pub fn consumed(&self) -> AssetAmounts {
        AssetAmounts::new(self.consumed_a, self.consumed_b)
    }

    pub fn returned(&self) -> AssetAmounts {
        AssetAmounts::new(self.returned_a, self.returned_b)
    }
}

/// Outcome of a single strategy inside a deployment pass
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyDeployment {
    pub strategy: StrategyId,
    pub result: Result<DeploymentResult, VaultError>,
}

/// Outcome of a whole deployment pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeploymentReport {
    /// Timestamp of the pass in seconds
    pub started_at: u64,
    /// Whether the interval gate was bypassed by an operator
    pub forced: bool,
    pub deployments: Vec<StrategyDeployment>,
}

impl DeploymentReport {
    /// Strategies whose deployment failed in this pass
    pub fn failures(&self) -> Vec<(StrategyId, VaultError)> {
        self.deployments
            .iter()
            .filter_map(|deployment| match &deployment.result {
                Ok(_) => None,
                Err(err) => Some((deployment.strategy, err.clone())),
            })
            .collect()
    }

    /// Whether any strategy took funds in this pass
    pub fn pushed_funds(&self) -> bool {
        self.deployments.iter().any(|deployment| {
            matches!(&deployment.result, Ok(result) if !result.consumed().is_zero())
        })
    }
}

/// How a strategy's contribution entered the NAV
#[derive(Clone, Debug, PartialEq)]
pub enum ValuationStatus {
    /// Reported and priced just now
    Fresh,
    /// The strategy or the oracle failed; the last known value was used instead
    Stale(VaultError),
}

/// One strategy's line in a NAV report
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyValuation {
    pub strategy: StrategyId,
    pub holdings: Option<AssetAmounts>,
    pub value: U256,
    pub status: ValuationStatus,
}

/// Aggregated net asset value
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavReport {
    pub idle_value: U256,
    pub strategies: Vec<StrategyValuation>,
    pub total: U256,
}

impl NavReport {
    /// Returns `true` if any strategy contributed a last known value instead of a fresh one
    pub fn is_stale(&self) -> bool {
        self.strategies
            .iter()
            .any(|valuation| matches!(valuation.status, ValuationStatus::Stale(_)))
    }

    /// Keys of the strategies that were priced from their last known value
    pub fn stale_strategies(&self) -> Vec<StrategyId> {
        self.strategies
            .iter()
            .filter(|valuation| matches!(valuation.status, ValuationStatus::Stale(_)))
            .map(|valuation| valuation.strategy)
            .collect()
    }
}

/// Result of a successful mint
#[derive(Clone, Debug, PartialEq)]
pub struct MintReceipt {
    pub shares_issued: U256,
    /// Deployment pass triggered by this deposit, if the gate opened
    pub deployment: Option<DeploymentReport>,
}

/// Result of a successful burn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurnReceipt {
    pub shares_burned: U256,
    pub paid: AssetAmounts,
    /// Amounts pulled from strategies to cover the idle shortfall
    pub pulled_from_strategies: AssetAmounts,
}

/// Query view of the vault, for external callers
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct VaultQuery {
    pub idle_a: Nat,
    pub idle_b: Nat,
    pub total_shares: Nat,
    pub total_assets: Nat,
    pub stale_strategies: Vec<StrategyId>,
    pub last_deployment_timestamp: u64,
    pub paused: bool,
}

impl VaultQuery {
    pub fn new(
        idle: &AssetAmounts,
        total_shares: &U256,
        nav: &NavReport,
        last_deployment_timestamp: u64,
        paused: bool,
    ) -> Self {
        Self {
            idle_a: u256_to_nat(&idle.a),
            idle_b: u256_to_nat(&idle.b),
            total_shares: u256_to_nat(total_shares),
            total_assets: u256_to_nat(&nav.total),
            stale_strategies: nav.stale_strategies(),
            last_deployment_timestamp,
            paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amounts(a: u64, b: u64) -> AssetAmounts {
        AssetAmounts::new(U256::from(a), U256::from(b))
    }

    #[test]
    fn asset_amount_accessors_follow_the_asset() {
        let mut value = amounts(1, 2);
        assert_eq!(value.get(AssetId::A), U256::from(1u64));
        assert_eq!(value.get(AssetId::B), U256::from(2u64));
        *value.get_mut(AssetId::B) += U256::from(5u64);
        assert_eq!(value, amounts(1, 7));
        assert_eq!(AssetId::A.other(), AssetId::B);
    }

    #[test]
    fn asset_amount_arithmetic() {
        assert_eq!(amounts(5, 5).checked_add(&amounts(1, 2)).unwrap(), amounts(6, 7));
        assert_eq!(amounts(5, 5).checked_sub(&amounts(1, 2)).unwrap(), amounts(4, 3));
        assert!(amounts(1, 5).checked_sub(&amounts(2, 0)).is_err());
        assert_eq!(amounts(1, 5).saturating_sub(&amounts(2, 1)), amounts(0, 4));
        assert!(amounts(3, 3).covers(&amounts(3, 2)));
        assert!(!amounts(3, 3).covers(&amounts(4, 0)));
    }

    #[test]
    fn conservation_includes_swap_legs_and_held_balance() {
        let result = DeploymentResult {
            requested_a: U256::from(100u64),
            requested_b: U256::from(0u64),
            held_b: U256::from(10u64),
            swapped_out_a: U256::from(40u64),
            swapped_in_b: U256::from(40u64),
            consumed_a: U256::from(60u64),
            consumed_b: U256::from(45u64),
            returned_b: U256::from(5u64),
            ..Default::default()
        };
        assert!(result.is_conserved());

        let leaking = DeploymentResult {
            returned_b: U256::from(4u64),
            ..result
        };
        assert!(!leaking.is_conserved());
    }

    #[test]
    fn report_lists_failures() {
        let report = DeploymentReport {
            started_at: 10,
            forced: false,
            deployments: vec![
                StrategyDeployment {
                    strategy: 0,
                    result: Ok(DeploymentResult::default()),
                },
                StrategyDeployment {
                    strategy: 1,
                    result: Err(VaultError::SlippageExceeded),
                },
            ],
        };
        assert_eq!(report.failures(), vec![(1, VaultError::SlippageExceeded)]);
    }
}
