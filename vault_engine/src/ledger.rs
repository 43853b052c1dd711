//! Share ledger
//!
//! Holder balances and the share supply, plus the conversions between value and
//! shares. The ledger never reads the vault's balances itself: callers hand it the
//! NAV they snapshotted, so a conversion can not pick up half-updated state.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::{
    types::AssetAmounts,
    utils::{
        common::{checked_add, checked_sub, mul_div},
        error::{VaultError, VaultResult},
    },
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShareLedger {
    balances: HashMap<Address, U256>,
    total_shares: U256,
}

impl ShareLedger {
    /// Rebuilds a ledger from persisted balances. The supply is their sum.
    pub fn from_balances<I: IntoIterator<Item = (Address, U256)>>(
        balances: I,
    ) -> VaultResult<Self> {
        let mut ledger = Self::default();
        for (holder, shares) in balances {
            ledger.credit(holder, shares)?;
        }
        Ok(ledger)
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    /// Holders with a nonzero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    /// Shares a deposit worth `deposit_value` is entitled to, given the NAV taken
    /// before the deposit touched any balance
    pub fn shares_for_deposit(&self, deposit_value: U256, nav_before: U256) -> VaultResult<U256> {
        if self.total_shares.is_zero() {
            return Ok(deposit_value);
        }
        if nav_before.is_zero() {
            return Err(VaultError::AccountingViolation(
                "Shares are outstanding against zero assets.".to_string(),
            ));
        }
        mul_div(self.total_shares, deposit_value, nav_before)
    }

    /// Value `shares` are entitled to at the given NAV, rounded down
    pub fn value_of_shares(&self, shares: U256, nav: U256) -> VaultResult<U256> {
        if shares > self.total_shares {
            return Err(VaultError::InsufficientShares);
        }
        if shares.is_zero() {
            return Ok(U256::ZERO);
        }
        mul_div(shares, nav, self.total_shares)
    }

    /// Fails with `InsufficientShares` if the holder owns fewer than `shares`
    pub fn ensure_balance(&self, holder: &Address, shares: U256) -> VaultResult<()> {
        if self.balance_of(holder) < shares {
            return Err(VaultError::InsufficientShares);
        }
        Ok(())
    }

    pub fn credit(&mut self, holder: Address, shares: U256) -> VaultResult<()> {
        if shares.is_zero() {
            return Ok(());
        }
        let total = checked_add(self.total_shares, shares, "Total shares")?;
        let balance = self.balances.entry(holder).or_default();
        *balance = checked_add(*balance, shares, "Share balance")?;
        self.total_shares = total;
        Ok(())
    }

    /// Burns shares. A balance that reaches zero is removed.
    pub fn debit(&mut self, holder: &Address, shares: U256) -> VaultResult<()> {
        self.ensure_balance(holder, shares)?;
        if shares.is_zero() {
            return Ok(());
        }
        let remaining = checked_sub(self.balance_of(holder), shares, "Share balance")?;
        self.total_shares = checked_sub(self.total_shares, shares, "Total shares")?;
        if remaining.is_zero() {
            self.balances.remove(holder);
        } else {
            self.balances.insert(*holder, remaining);
        }
        Ok(())
    }
}

/// The `part / whole` fraction of each asset in `amounts`, rounded down.
/// Taking the whole hands out everything.
pub fn pro_rata(amounts: &AssetAmounts, part: U256, whole: U256) -> VaultResult<AssetAmounts> {
    if part >= whole {
        return Ok(*amounts);
    }
    Ok(AssetAmounts::new(
        mul_div(amounts.a, part, whole)?,
        mul_div(amounts.b, part, whole)?,
    ))
}
