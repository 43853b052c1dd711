//! Rebalancer
//!
//! Deploys an amount of both assets into one strategy. The offer is first brought
//! in line with the venue's current holding ratio, counting whatever the strategy
//! already holds, by swapping the smallest amount of the excess asset. Whatever the
//! venue does not consume goes back to the idle balances before `deploy` returns.

use alloy_primitives::U256;

use crate::{
    clock::Clock,
    constants::BPS_DENOMINATOR,
    journal::{JournalCollection, LogType},
    providers::{ensure_before, value_of, SwapExecutor, ValuationOracle},
    strategy::Strategy,
    types::{AssetAmounts, AssetId, DeploymentResult, Ratio},
    utils::{
        common::{checked_add, checked_sub, mul_div, mul_div_up},
        error::{VaultError, VaultResult},
    },
};

/// Swap that brings an offer in line with the venue ratio
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapLeg {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: U256,
    /// Output implied by the oracle prices
    pub expected_out: U256,
    /// Lowest acceptable output given the slippage bound
    pub min_out: U256,
}

/// Result of ratio matching, computed before any funds move
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RatioPlan {
    /// Amounts of each asset the whole pot (requested + held) should hold at the venue ratio
    pub target: AssetAmounts,
    /// `max(0, target - held)` per asset
    pub needed: AssetAmounts,
    pub swap: Option<SwapLeg>,
}

/// Computes the swap needed to match `ratio`.
///
/// The pot is valued in the common unit of account and split along the venue ratio.
/// Amounts the strategy already holds count towards the target, so only the
/// difference is sourced from `requested`.
pub fn plan_ratio_match(
    requested: &AssetAmounts,
    held: &AssetAmounts,
    ratio: &Ratio,
    oracle: &dyn ValuationOracle,
    max_slippage_bps: u64,
) -> VaultResult<RatioPlan> {
    let pot = requested.checked_add(held)?;
    if ratio.is_empty() || pot.is_zero() {
        return Ok(RatioPlan {
            target: pot,
            needed: pot.saturating_sub(held),
            swap: None,
        });
    }

    let pot_value = value_of(oracle, &pot)?;
    let unit_value = value_of(oracle, &AssetAmounts::new(ratio.a, ratio.b))?;
    if unit_value.is_zero() {
        return Err(VaultError::StaleValuation(
            "The venue ratio is valued at zero.".to_string(),
        ));
    }

    let target = AssetAmounts::new(
        mul_div(ratio.a, pot_value, unit_value)?,
        mul_div(ratio.b, pot_value, unit_value)?,
    );
    let needed = target.saturating_sub(held);

    let short = if needed.a > requested.a {
        AssetId::A
    } else if needed.b > requested.b {
        AssetId::B
    } else {
        return Ok(RatioPlan {
            target,
            needed,
            swap: None,
        });
    };
    let excess = short.other();

    let shortfall = checked_sub(needed.get(short), requested.get(short), "Shortfall")?;
    let surplus = requested.get(excess).saturating_sub(needed.get(excess));
    if surplus.is_zero() {
        // Only the held balance is off-ratio; the leftover goes back to idle.
        return Ok(RatioPlan {
            target,
            needed,
            swap: None,
        });
    }

    let shortfall_value = oracle.valuation(short, shortfall)?;
    let surplus_value = oracle.valuation(excess, surplus)?;
    if shortfall_value.is_zero() || surplus_value.is_zero() {
        return Ok(RatioPlan {
            target,
            needed,
            swap: None,
        });
    }

    let amount_in = mul_div_up(surplus, shortfall_value, surplus_value)?.min(surplus);
    let expected_out = if amount_in == surplus && surplus_value < shortfall_value {
        mul_div(shortfall, surplus_value, shortfall_value)?
    } else {
        shortfall
    };
    let min_out = mul_div(
        expected_out,
        U256::from(BPS_DENOMINATOR.saturating_sub(max_slippage_bps)),
        U256::from(BPS_DENOMINATOR),
    )?;

    Ok(RatioPlan {
        target,
        needed,
        swap: Some(SwapLeg {
            asset_in: excess,
            asset_out: short,
            amount_in,
            expected_out,
            min_out,
        }),
    })
}

/// Executes deployments against one strategy at a time
pub struct Rebalancer<'a> {
    oracle: &'a dyn ValuationOracle,
    swap: &'a dyn SwapExecutor,
    clock: &'a dyn Clock,
    max_slippage_bps: u64,
}

impl<'a> Rebalancer<'a> {
    pub fn new(
        oracle: &'a dyn ValuationOracle,
        swap: &'a dyn SwapExecutor,
        clock: &'a dyn Clock,
        max_slippage_bps: u64,
    ) -> Self {
        Self {
            oracle,
            swap,
            clock,
            max_slippage_bps,
        }
    }

    /// Moves `requested` out of `idle` into `strategy`.
    ///
    /// On success `idle` has lost exactly `requested` and gained every unconsumed
    /// token, and the strategy holds nothing loose. On failure before the swap
    /// `idle` is untouched; on failure after it, `idle` gets the post-swap amounts
    /// back.
    pub fn deploy(
        &self,
        strategy: &mut dyn Strategy,
        idle: &mut AssetAmounts,
        requested: AssetAmounts,
        deadline: u64,
        journal: &mut JournalCollection,
    ) -> VaultResult<DeploymentResult> {
        if !idle.covers(&requested) {
            return Err(VaultError::AccountingViolation(format!(
                "Deployment of {:?} exceeds the idle balances {:?}.",
                requested, idle
            )));
        }
        ensure_before(self.clock.now(), deadline)?;

        let held_before = strategy.held();
        let ratio = strategy.venue_ratio()?;
        let plan = plan_ratio_match(
            &requested,
            &held_before,
            &ratio,
            self.oracle,
            self.max_slippage_bps,
        )?;

        if let Some(leg) = &plan.swap {
            let quote = self.swap.quote(leg.asset_in, leg.asset_out, leg.amount_in)?;
            if quote < leg.min_out {
                journal.append_note(
                    Err(VaultError::SlippageExceeded),
                    LogType::Rebalance,
                    format!(
                        "Quote of {} for {} is below the minimum of {}.",
                        quote, leg.amount_in, leg.min_out
                    ),
                );
                return Err(VaultError::SlippageExceeded);
            }
        }

        let mut result = DeploymentResult {
            requested_a: requested.a,
            requested_b: requested.b,
            held_a: held_before.a,
            held_b: held_before.b,
            ..Default::default()
        };

        // From here on `in_flight` is owned by neither the idle balances nor the strategy.
        *idle = idle.checked_sub(&requested)?;
        let mut in_flight = requested;

        if let Some(leg) = plan.swap {
            let swapped = self
                .swap
                .swap(
                    leg.asset_in,
                    leg.asset_out,
                    leg.amount_in,
                    leg.min_out,
                    deadline,
                )
                .and_then(|out| {
                    if out < leg.min_out {
                        Err(VaultError::SlippageExceeded)
                    } else {
                        Ok(out)
                    }
                });
            let out = match swapped {
                Ok(out) => out,
                Err(err) => {
                    *idle = idle.checked_add(&in_flight)?;
                    return Err(err);
                }
            };

            *in_flight.get_mut(leg.asset_in) =
                checked_sub(in_flight.get(leg.asset_in), leg.amount_in, "Swap input")?;
            *in_flight.get_mut(leg.asset_out) =
                checked_add(in_flight.get(leg.asset_out), out, "Swap output")?;
            match leg.asset_in {
                AssetId::A => {
                    result.swapped_out_a = leg.amount_in;
                    result.swapped_in_b = out;
                }
                AssetId::B => {
                    result.swapped_out_b = leg.amount_in;
                    result.swapped_in_a = out;
                }
            }
            journal.append_note(
                Ok(()),
                LogType::Rebalance,
                format!(
                    "Swapped {} of {:?} for {} of {:?}.",
                    leg.amount_in, leg.asset_in, out, leg.asset_out
                ),
            );
        }

        if let Err(err) = ensure_before(self.clock.now(), deadline) {
            *idle = idle.checked_add(&in_flight)?;
            return Err(err);
        }

        let outcome = match strategy.deposit(in_flight, AssetAmounts::zero(), deadline) {
            Ok(outcome) => outcome,
            Err(err) => {
                *idle = idle.checked_add(&in_flight)?;
                return Err(err);
            }
        };

        // Leftovers are credited before anything else can fail.
        *idle = idle.checked_add(&outcome.returned)?;

        result.consumed_a = outcome.consumed.a;
        result.consumed_b = outcome.consumed.b;
        result.returned_a = outcome.returned.a;
        result.returned_b = outcome.returned.b;

        if !result.is_conserved() || !strategy.held().is_zero() {
            return Err(VaultError::AccountingViolation(format!(
                "Deployment does not balance: {:?}, strategy still holds {:?}.",
                result,
                strategy.held()
            )));
        }

        if !outcome.returned.is_zero() {
            journal.append_note(
                Ok(()),
                LogType::Rebalance,
                format!("Returned leftover {:?} to idle.", outcome.returned),
            );
        }
        if outcome.consumed.is_zero() {
            journal.append_note(
                Ok(()),
                LogType::Rebalance,
                "Venue consumed nothing; deployment is a no-op.",
            );
            return Ok(result);
        }

        result.received_position_value = value_of(self.oracle, &outcome.consumed)?;
        Ok(result)
    }
}
