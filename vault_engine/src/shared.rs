//! Thread-safe vault handle
//!
//! Mutations take the write lock and run inside the reentrancy guard; reads share
//! the read lock, so readers see the state before or after a mutation, never in
//! between. A call that comes back into the vault from inside one of its own
//! external calls fails with `ReentrantCall` instead of deadlocking.

use std::sync::{Arc, PoisonError, RwLock};

use alloy_primitives::{Address, U256};

use crate::{
    clock::Clock,
    guard::ReentrancyGuard,
    state::StableVault,
    types::{AssetAmounts, BurnReceipt, DeploymentReport, MintReceipt, NavReport},
    utils::error::{VaultError, VaultResult},
    vault::Vault,
};

pub struct SharedVault {
    vault: RwLock<Vault>,
    guard: ReentrancyGuard,
    clock: Arc<dyn Clock>,
}

fn poisoned<T>(_: PoisonError<T>) -> VaultError {
    VaultError::Custom("A mutation panicked; the vault state is unreliable.".to_string())
}

impl SharedVault {
    pub fn new(vault: Vault) -> Self {
        Self {
            clock: vault.clock(),
            vault: RwLock::new(vault),
            guard: ReentrancyGuard::default(),
        }
    }

    /// Runs a mutating operation with exclusive access
    pub fn mutate<T, F>(&self, operation: F) -> VaultResult<T>
    where
        F: FnOnce(&mut Vault) -> VaultResult<T>,
    {
        self.guard.check()?;
        let mut vault = self.vault.write().map_err(poisoned)?;
        // Dropped before the write lock is released
        let _token = self.guard.enter(self.clock.now())?;
        operation(&mut vault)
    }

    /// Runs a read against a consistent state
    pub fn read<T, F>(&self, query: F) -> VaultResult<T>
    where
        F: FnOnce(&Vault) -> VaultResult<T>,
    {
        self.guard.check()?;
        let vault = self.vault.read().map_err(poisoned)?;
        query(&vault)
    }

    /// Timestamp at which the running mutation started, if one is running
    pub fn busy_since(&self) -> Option<u64> {
        self.guard.locked_since()
    }

    pub fn mint(&self, depositor: Address, deposit: AssetAmounts) -> VaultResult<MintReceipt> {
        self.mutate(|vault| vault.mint(depositor, deposit))
    }

    pub fn burn(&self, holder: Address, shares: U256) -> VaultResult<BurnReceipt> {
        self.mutate(|vault| vault.burn(holder, shares))
    }

    pub fn force_deployment(&self) -> VaultResult<Option<DeploymentReport>> {
        self.mutate(|vault| vault.force_deployment())
    }

    pub fn total_assets(&self) -> VaultResult<U256> {
        self.read(|vault| vault.total_assets())
    }

    pub fn nav_report(&self) -> VaultResult<NavReport> {
        self.read(|vault| vault.nav_report())
    }

    pub fn share_price(&self) -> VaultResult<U256> {
        self.read(|vault| vault.share_price())
    }

    pub fn balance_of(&self, holder: &Address) -> VaultResult<U256> {
        self.read(|vault| Ok(vault.balance_of(holder)))
    }

    pub fn snapshot(&self) -> VaultResult<StableVault> {
        self.read(|vault| Ok(vault.snapshot()))
    }
}
