//! Strategy variant backed by a two-asset liquidity venue

use alloy_primitives::U256;
use candid::{CandidType, Nat};
use serde::Deserialize;

use crate::{
    providers::{value_of, LiquidityVenue, ValuationOracle},
    types::{AssetAmounts, DepositOutcome, Ratio},
    utils::{
        common::{checked_add, checked_sub, mul_div_up, nat_to_u256, u256_to_nat},
        error::{VaultError, VaultResult},
    },
};

use super::Strategy;

/// Strategy that owns a position in a `LiquidityVenue`
pub struct LiquidityStrategy {
    venue: Box<dyn LiquidityVenue>,
    /// Units of the venue position owned by this strategy
    position_units: U256,
    /// Tokens owned by the strategy that are not inside the venue
    held: AssetAmounts,
}

/// Persisted form of a `LiquidityStrategy`'s position
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct LiquidityPosition {
    pub position_units: Nat,
    pub held_a: Nat,
    pub held_b: Nat,
}

impl LiquidityStrategy {
    pub fn new(venue: Box<dyn LiquidityVenue>) -> Self {
        Self {
            venue,
            position_units: U256::ZERO,
            held: AssetAmounts::zero(),
        }
    }

    /// Rebuilds a strategy from its persisted position
    pub fn from_position(
        venue: Box<dyn LiquidityVenue>,
        position: &LiquidityPosition,
    ) -> VaultResult<Self> {
        Ok(Self {
            venue,
            position_units: nat_to_u256(&position.position_units)?,
            held: AssetAmounts::new(nat_to_u256(&position.held_a)?, nat_to_u256(&position.held_b)?),
        })
    }

    /// Persisted form of the position
    pub fn position(&self) -> LiquidityPosition {
        LiquidityPosition {
            position_units: u256_to_nat(&self.position_units),
            held_a: u256_to_nat(&self.held.a),
            held_b: u256_to_nat(&self.held.b),
        }
    }

    pub fn position_units(&self) -> U256 {
        self.position_units
    }

    /// Credits tokens that reached the strategy outside of a deposit
    pub fn credit_held(&mut self, amounts: AssetAmounts) -> VaultResult<()> {
        self.held = self.held.checked_add(&amounts)?;
        Ok(())
    }

    fn position_value(&self, units: U256) -> VaultResult<AssetAmounts> {
        if units.is_zero() {
            return Ok(AssetAmounts::zero());
        }
        self.venue.total_position_value(units)
    }

    /// Redeems `units` and updates the position
    fn redeem(&mut self, units: U256, deadline: u64) -> VaultResult<AssetAmounts> {
        if units.is_zero() {
            return Ok(AssetAmounts::zero());
        }
        let amounts = self
            .venue
            .withdraw(units, deadline)
            .map_err(venue_rejection)?;
        self.position_units = checked_sub(self.position_units, units, "Position units")?;
        Ok(amounts)
    }
}

/// Keeps deadline expiry distinguishable, wraps anything else as a venue rejection
fn venue_rejection(err: VaultError) -> VaultError {
    match err {
        VaultError::DeadlineExceeded | VaultError::VenueRejected(_) => err,
        other => VaultError::VenueRejected(format!("{:?}", other)),
    }
}

impl Strategy for LiquidityStrategy {
    fn venue_ratio(&self) -> VaultResult<Ratio> {
        self.venue.current_ratio()
    }

    fn held(&self) -> AssetAmounts {
        self.held
    }

    fn current_holdings(&self) -> VaultResult<AssetAmounts> {
        self.position_value(self.position_units)?
            .checked_add(&self.held)
    }

    fn withdrawable(&self) -> VaultResult<AssetAmounts> {
        if self.position_units.is_zero() {
            return Ok(self.held);
        }
        let units = self
            .venue
            .withdrawable_units(self.position_units)?
            .min(self.position_units);
        self.position_value(units)?.checked_add(&self.held)
    }

    fn deposit(
        &mut self,
        offered: AssetAmounts,
        min: AssetAmounts,
        deadline: u64,
    ) -> VaultResult<DepositOutcome> {
        let total_offer = offered.checked_add(&self.held)?;
        if total_offer.is_zero() {
            return Ok(DepositOutcome::default());
        }

        // On failure nothing changed hands: the loose balance stays with the strategy
        // and the caller keeps the offered amounts.
        let receipt = self
            .venue
            .deposit(total_offer.a, total_offer.b, min.a, min.b, deadline)
            .map_err(venue_rejection)?;

        if !total_offer.covers(&receipt.consumed) {
            return Err(VaultError::AccountingViolation(format!(
                "Venue consumed {:?} out of an offer of {:?}.",
                receipt.consumed, total_offer
            )));
        }

        self.position_units = checked_add(
            self.position_units,
            receipt.position_units,
            "Position units",
        )?;
        let returned = total_offer.checked_sub(&receipt.consumed)?;
        self.held = AssetAmounts::zero();

        Ok(DepositOutcome {
            consumed: receipt.consumed,
            returned,
            position_units: receipt.position_units,
        })
    }

    /// Releases the loose balance first, then redeems position units rounded up so the
    /// target is met whenever the position allows it. May return more than `target_value`
    /// when the loose balance alone exceeds it, never more than the holdings.
    fn withdraw(
        &mut self,
        target_value: U256,
        oracle: &dyn ValuationOracle,
        deadline: u64,
    ) -> VaultResult<AssetAmounts> {
        if target_value.is_zero() {
            return Ok(AssetAmounts::zero());
        }

        let released = self.held;
        let released_value = value_of(oracle, &released)?;
        self.held = AssetAmounts::zero();

        let remaining = target_value.saturating_sub(released_value);
        if remaining.is_zero() || self.position_units.is_zero() {
            return Ok(released);
        }

        let position = self.position_value(self.position_units)?;
        let position_value = value_of(oracle, &position)?;
        if position_value.is_zero() {
            return Ok(released);
        }

        let redeemable = self
            .venue
            .withdrawable_units(self.position_units)?
            .min(self.position_units);
        let units = mul_div_up(self.position_units, remaining, position_value)?.min(redeemable);

        match self.redeem(units, deadline) {
            Ok(amounts) => released.checked_add(&amounts),
            Err(err) => {
                // The loose balance was not handed out
                self.held = released;
                Err(err)
            }
        }
    }

    fn withdraw_all(&mut self, deadline: u64) -> VaultResult<AssetAmounts> {
        let amounts = self.redeem(self.position_units, deadline)?;
        let released = amounts.checked_add(&self.held)?;
        self.held = AssetAmounts::zero();
        Ok(released)
    }

    /// Re-deposits the amounts; what the venue does not take is kept as loose balance
    fn reinstate(&mut self, amounts: AssetAmounts, deadline: u64) -> VaultResult<()> {
        match self.deposit(amounts, AssetAmounts::zero(), deadline) {
            Ok(outcome) => self.credit_held(outcome.returned),
            Err(VaultError::AccountingViolation(reason)) => {
                Err(VaultError::AccountingViolation(reason))
            }
            // The rejected deposit left the loose balance in place
            Err(_) => self.credit_held(amounts),
        }
    }
}
