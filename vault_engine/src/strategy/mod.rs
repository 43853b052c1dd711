//! Strategy abstraction
//!
//! A strategy wraps one external liquidity venue. The vault never holds the venue's
//! position directly: it only asks the strategy what the position is worth and to
//! hand assets back.

pub(crate) mod data;
pub(crate) mod liquidity;
pub(crate) mod settings;

use alloy_primitives::U256;

use crate::{
    providers::ValuationOracle,
    types::{AssetAmounts, DepositOutcome, Ratio},
    utils::error::VaultResult,
};

pub use data::StrategyData;
pub use liquidity::{LiquidityPosition, LiquidityStrategy};
pub use settings::StrategySettings;

/// Capabilities every strategy variant provides.
///
/// Implementations must uphold:
/// - `current_holdings` is a pure read.
/// - `withdraw` never returns more than `current_holdings` reported right before the call.
/// - `deposit` hands every offered or previously held token the venue did not consume
///   back in `DepositOutcome::returned` and leaves `held` at zero.
pub trait Strategy: Send + Sync {
    /// Current A:B holding ratio of the underlying venue
    fn venue_ratio(&self) -> VaultResult<Ratio>;

    /// Loose balance the strategy holds outside the venue
    fn held(&self) -> AssetAmounts;

    /// Everything the strategy owns: venue position plus loose balance
    fn current_holdings(&self) -> VaultResult<AssetAmounts>;

    /// What can be pulled out right now
    fn withdrawable(&self) -> VaultResult<AssetAmounts> {
        self.current_holdings()
    }

    /// Offers `offered` plus the loose balance to the venue
    fn deposit(
        &mut self,
        offered: AssetAmounts,
        min: AssetAmounts,
        deadline: u64,
    ) -> VaultResult<DepositOutcome>;

    /// Pulls at least `target_value` worth of assets if the holdings allow it
    fn withdraw(
        &mut self,
        target_value: U256,
        oracle: &dyn ValuationOracle,
        deadline: u64,
    ) -> VaultResult<AssetAmounts>;

    /// Pulls the whole position and loose balance
    fn withdraw_all(&mut self, deadline: u64) -> VaultResult<AssetAmounts>;

    /// Takes back amounts withdrawn by a redemption that did not go through.
    /// Afterwards `current_holdings` covers `amounts` again, in the venue or loose.
    fn reinstate(&mut self, amounts: AssetAmounts, deadline: u64) -> VaultResult<()>;
}
