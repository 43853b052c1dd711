//! NAV aggregator
//!
//! Sums the value of the idle balances and of every active strategy's holdings.
//! Aggregation is a pure read: a strategy that fails to report, or whose holdings
//! cannot be priced, contributes its last known value flagged as `Stale`. Recording
//! fresh values as the new last known ones is a separate step done by mutating
//! operations.

use alloy_primitives::U256;

use crate::{
    providers::{value_of, ValuationOracle},
    registry::StrategyRegistry,
    types::{AssetAmounts, NavReport, StrategyValuation, ValuationStatus},
    utils::{
        common::checked_add,
        error::{VaultError, VaultResult},
    },
};

/// Computes the aggregated NAV.
///
/// Fails with `StaleValuation` only when the idle balances cannot be priced, since
/// there is no last known value to fall back on for them.
pub fn aggregate(
    idle: &AssetAmounts,
    registry: &StrategyRegistry,
    oracle: &dyn ValuationOracle,
) -> VaultResult<NavReport> {
    let idle_value = value_of(oracle, idle).map_err(stale)?;
    let mut total = idle_value;
    let mut strategies = Vec::with_capacity(registry.len());

    for key in registry.active_keys() {
        let entry = registry.get(key)?;
        let valuation = match entry.strategy.current_holdings() {
            Ok(holdings) => match value_of(oracle, &holdings) {
                Ok(value) => StrategyValuation {
                    strategy: key,
                    holdings: Some(holdings),
                    value,
                    status: ValuationStatus::Fresh,
                },
                Err(err) => StrategyValuation {
                    strategy: key,
                    holdings: Some(holdings),
                    value: entry.data.last_known_value,
                    status: ValuationStatus::Stale(stale(err)),
                },
            },
            Err(err) => StrategyValuation {
                strategy: key,
                holdings: None,
                value: entry.data.last_known_value,
                status: ValuationStatus::Stale(stale(err)),
            },
        };
        total = checked_add(total, valuation.value, "Total assets")?;
        strategies.push(valuation);
    }

    Ok(NavReport {
        idle_value,
        strategies,
        total,
    })
}

/// Stores every fresh strategy value of `report` as the strategy's last known value
pub fn record(report: &NavReport, registry: &mut StrategyRegistry, now: u64) -> VaultResult<()> {
    for valuation in &report.strategies {
        if valuation.status != ValuationStatus::Fresh {
            continue;
        }
        // The strategy may have been removed since the report was taken.
        if let Ok(entry) = registry.get_mut(valuation.strategy) {
            entry.data.last_known_value(valuation.value, now);
        }
    }
    Ok(())
}

/// Value of the idle balances alone
pub fn idle_value(idle: &AssetAmounts, oracle: &dyn ValuationOracle) -> VaultResult<U256> {
    value_of(oracle, idle).map_err(stale)
}

/// Reporting failures surface as `StaleValuation`; deadline expiry stays as is
fn stale(err: VaultError) -> VaultError {
    match err {
        VaultError::StaleValuation(_) | VaultError::DeadlineExceeded => err,
        other => VaultError::StaleValuation(format!("{:?}", other)),
    }
}
