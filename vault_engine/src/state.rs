//! Persisted vault state
//!
//! The stable form holds everything that must survive a restart: idle balances,
//! holder balances and supply, per-strategy settings, the last deployment timestamp
//! and the pause switch. Values are candid `Nat`s and addresses are strings, so the
//! whole struct round-trips through candid bytes. Venue positions are owned by the
//! strategies and persisted by them.

use alloy_primitives::Address;
use candid::{CandidType, Decode, Encode, Nat};
use serde::Deserialize;

use crate::{
    config::VaultConfigInput,
    halt::Halt,
    strategy::{StrategyData, StrategySettings},
    types::AssetAmounts,
    utils::{
        common::{nat_to_u256, string_to_address, u256_to_nat},
        error::{VaultError, VaultResult},
    },
};

/// Persisted form of a registry entry
#[derive(Clone, CandidType, Debug, Default, Deserialize, PartialEq)]
pub struct StableStrategy {
    /// Operator-controlled settings
    pub settings: StrategySettings,
    /// Last value the strategy reported successfully
    pub last_known_value: Nat,
    pub last_valued_at: u64,
    pub last_deployment_at: u64,
}

impl StableStrategy {
    /// Builder-style setter functions for the struct

    /// Set the strategy settings
    pub fn settings(&mut self, settings: StrategySettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Set the strategy data
    pub fn data(&mut self, data: &StrategyData) -> &mut Self {
        self.last_known_value = u256_to_nat(&data.last_known_value);
        self.last_valued_at = data.last_valued_at;
        self.last_deployment_at = data.last_deployment_at;
        self
    }
}

impl TryFrom<&StableStrategy> for StrategyData {
    type Error = VaultError;

    fn try_from(value: &StableStrategy) -> Result<Self, Self::Error> {
        let mut data = StrategyData::default();
        data.last_known_value(nat_to_u256(&value.last_known_value)?, value.last_valued_at)
            .last_deployment_at(value.last_deployment_at);
        Ok(data)
    }
}

/// Persisted form of a holder balance
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct StableBalance {
    pub holder: String,
    pub shares: Nat,
}

/// Persisted form of a vault
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct StableVault {
    pub config: VaultConfigInput,
    pub idle_a: Nat,
    pub idle_b: Nat,
    pub total_shares: Nat,
    pub balances: Vec<StableBalance>,
    pub last_deployment_timestamp: u64,
    pub halt: Halt,
    /// Registry entries in key order
    pub strategies: Vec<StableStrategy>,
}

impl StableVault {
    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        Encode!(self).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
    }

    pub fn from_bytes(bytes: &[u8]) -> VaultResult<Self> {
        Decode!(bytes, Self).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
    }

    pub fn idle(&self) -> VaultResult<AssetAmounts> {
        Ok(AssetAmounts::new(
            nat_to_u256(&self.idle_a)?,
            nat_to_u256(&self.idle_b)?,
        ))
    }

    /// Decoded holder balances
    pub fn decoded_balances(&self) -> VaultResult<Vec<(Address, alloy_primitives::U256)>> {
        self.balances
            .iter()
            .map(|balance| {
                Ok((
                    string_to_address(&balance.holder)?,
                    nat_to_u256(&balance.shares)?,
                ))
            })
            .collect()
    }
}
