//! Interfaces of the external collaborators the engine consumes.
//!
//! None of them is implemented here. Every call that can hand control to code the
//! engine does not own carries a `deadline` (seconds) after which the collaborator
//! must give up with `VaultError::DeadlineExceeded`.

use alloy_primitives::U256;

use crate::{
    types::{AssetAmounts, AssetId, Ratio},
    utils::{
        common::checked_add,
        error::{VaultError, VaultResult},
    },
};

/// Prices held assets in the common unit of account.
/// Fails closed with `StaleValuation` instead of returning zero or a placeholder price.
#[cfg_attr(test, mockall::automock)]
pub trait ValuationOracle: Send + Sync {
    fn valuation(&self, asset: AssetId, amount: U256) -> VaultResult<U256>;
}

/// Opaque token-swap venue used for ratio matching
#[cfg_attr(test, mockall::automock)]
pub trait SwapExecutor: Send + Sync {
    /// Expected output of swapping `amount_in` of `asset_in`
    fn quote(&self, asset_in: AssetId, asset_out: AssetId, amount_in: U256) -> VaultResult<U256>;

    /// Swaps and returns the output amount; must fail if it would be below `min_amount_out`
    fn swap(
        &self,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: U256,
        min_amount_out: U256,
        deadline: u64,
    ) -> VaultResult<U256>;
}

/// What a liquidity venue reports from a deposit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VenueDeposit {
    pub consumed: AssetAmounts,
    pub position_units: U256,
}

/// External liquidity venue a strategy deposits into
#[cfg_attr(test, mockall::automock)]
pub trait LiquidityVenue: Send + Sync {
    /// Offers both amounts; the venue may consume less than offered
    fn deposit(
        &mut self,
        amount_a: U256,
        amount_b: U256,
        min_amount_a: U256,
        min_amount_b: U256,
        deadline: u64,
    ) -> VaultResult<VenueDeposit>;

    /// Redeems position units for the underlying assets
    fn withdraw(&mut self, position_units: U256, deadline: u64) -> VaultResult<AssetAmounts>;

    /// Current holding ratio of asset A to asset B inside the venue
    fn current_ratio(&self) -> VaultResult<Ratio>;

    /// Underlying assets that `position_units` currently represent
    fn total_position_value(&self, position_units: U256) -> VaultResult<AssetAmounts>;

    /// How many of `position_units` can be redeemed right now
    fn withdrawable_units(&self, position_units: U256) -> VaultResult<U256>;
}

/// Values both assets and adds them. Zero amounts are not sent to the oracle.
pub fn value_of(oracle: &dyn ValuationOracle, amounts: &AssetAmounts) -> VaultResult<U256> {
    let mut total = U256::ZERO;
    for asset in [AssetId::A, AssetId::B] {
        let amount = amounts.get(asset);
        if amount.is_zero() {
            continue;
        }
        total = checked_add(total, oracle.valuation(asset, amount)?, "Valuation")?;
    }
    Ok(total)
}

/// Fails with `DeadlineExceeded` if `now` is past `deadline`
pub fn ensure_before(now: u64, deadline: u64) -> VaultResult<()> {
    if now > deadline {
        return Err(VaultError::DeadlineExceeded);
    }
    Ok(())
}
