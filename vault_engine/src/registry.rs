//! Strategy registry
//!
//! Ordered collection of strategies keyed by a stable `StrategyId`. Keys are handed
//! out in increasing order and never reused, so key order is registration order.

use std::collections::BTreeMap;

use crate::{
    constants::BPS_DENOMINATOR,
    strategy::{Strategy, StrategyData, StrategySettings},
    types::StrategyId,
    utils::error::{VaultError, VaultResult},
};

/// A registered strategy with the vault's bookkeeping about it
pub struct StrategyEntry {
    pub settings: StrategySettings,
    pub data: StrategyData,
    pub strategy: Box<dyn Strategy>,
}

#[derive(Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<StrategyId, StrategyEntry>,
    next_key: StrategyId,
}

impl StrategyRegistry {
    /// Registers a new active strategy and returns its key
    pub fn register<S: AsRef<str>>(
        &mut self,
        name: S,
        weight_bps: u64,
        strategy: Box<dyn Strategy>,
    ) -> VaultResult<StrategyId> {
        self.ensure_weight_fits(None, weight_bps)?;

        let key = self.next_key;
        self.next_key = key
            .checked_add(1)
            .ok_or_else(|| VaultError::Custom("Strategy keys are exhausted.".to_string()))?;

        let mut settings = StrategySettings::default();
        settings.key(key).name(name).weight_bps(weight_bps).active(true);

        self.entries.insert(
            key,
            StrategyEntry {
                settings,
                data: StrategyData::default(),
                strategy,
            },
        );
        Ok(key)
    }

    /// Re-inserts a strategy under a known key, used when restoring persisted state
    pub fn restore(
        &mut self,
        settings: StrategySettings,
        data: StrategyData,
        strategy: Box<dyn Strategy>,
    ) -> VaultResult<()> {
        // Ensure that we do not overwrite an existing strategy with the same key
        if self.entries.contains_key(&settings.key) {
            return Err(VaultError::Custom(
                "This strategy key is already registered.".to_string(),
            ));
        }
        if !settings.has_valid_weight() {
            return Err(VaultError::InvalidConfiguration(format!(
                "Strategy {} has a weight above 100%.",
                settings.key
            )));
        }
        let key = settings.key;
        self.entries.insert(
            key,
            StrategyEntry {
                settings,
                data,
                strategy,
            },
        );
        self.next_key = self.next_key.max(key.saturating_add(1));
        if self.total_weight() > BPS_DENOMINATOR {
            self.entries.remove(&key);
            return Err(VaultError::InvalidConfiguration(
                "Restored strategy weights exceed 100%.".to_string(),
            ));
        }
        Ok(())
    }

    /// Removes a strategy. Refused while the strategy still reports holdings.
    pub fn remove(&mut self, key: StrategyId) -> VaultResult<StrategyEntry> {
        let entry = self.get(key)?;
        let holdings = entry.strategy.current_holdings()?;
        if !holdings.is_zero() {
            return Err(VaultError::StrategyNotRemovable);
        }
        self.entries.remove(&key).ok_or(VaultError::NonExistentValue)
    }

    pub fn set_weight(&mut self, key: StrategyId, weight_bps: u64) -> VaultResult<()> {
        self.get(key)?;
        self.ensure_weight_fits(Some(key), weight_bps)?;
        self.get_mut(key)?.settings.weight_bps(weight_bps);
        Ok(())
    }

    pub fn set_active(&mut self, key: StrategyId, active: bool) -> VaultResult<()> {
        self.get_mut(key)?.settings.active(active);
        Ok(())
    }

    pub fn get(&self, key: StrategyId) -> VaultResult<&StrategyEntry> {
        self.entries.get(&key).ok_or(VaultError::NonExistentValue)
    }

    pub fn get_mut(&mut self, key: StrategyId) -> VaultResult<&mut StrategyEntry> {
        self.entries.get_mut(&key).ok_or(VaultError::NonExistentValue)
    }

    pub fn contains(&self, key: StrategyId) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all strategies in registry order
    pub fn keys(&self) -> Vec<StrategyId> {
        self.entries.keys().copied().collect()
    }

    /// Keys of active strategies in registry order
    pub fn active_keys(&self) -> Vec<StrategyId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.settings.active)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Active strategies with a nonzero weight, in registry order
    pub fn deployable(&self) -> Vec<(StrategyId, u64)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.settings.is_deployable())
            .map(|(key, entry)| (*key, entry.settings.weight_bps))
            .collect()
    }

    pub fn has_deployable(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.settings.is_deployable())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StrategyId, &StrategyEntry)> {
        self.entries.iter()
    }

    /// Sum of the weights of all registered strategies
    pub fn total_weight(&self) -> u64 {
        self.entries
            .values()
            .map(|entry| entry.settings.weight_bps)
            .sum()
    }

    /// Weights across strategies need not reach 100%, but may not exceed it.
    /// `replacing` is the key whose weight is being changed, if any.
    fn ensure_weight_fits(&self, replacing: Option<StrategyId>, weight_bps: u64) -> VaultResult<()> {
        let others: u64 = self
            .entries
            .iter()
            .filter(|(key, _)| Some(**key) != replacing)
            .map(|(_, entry)| entry.settings.weight_bps)
            .sum();
        let total = others.saturating_add(weight_bps);
        if total > BPS_DENOMINATOR {
            return Err(VaultError::InvalidConfiguration(format!(
                "Strategy weights would add up to {} bps.",
                total
            )));
        }
        Ok(())
    }
}
