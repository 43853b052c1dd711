//! Operator-tunable vault configuration

use alloy_primitives::U256;
use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        BPS_DENOMINATOR, DEFAULT_EXTERNAL_CALL_TIMEOUT, DEFAULT_MAX_SLIPPAGE_BPS,
        DEFAULT_MIN_DEPLOYMENT_INTERVAL, MAX_JOURNAL_COLLECTIONS,
    },
    utils::{
        common::string_to_u256,
        error::{VaultError, VaultResult},
    },
};

/// Runtime configuration of a vault
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultConfig {
    /// Minimum idle value, in the common unit of account, that opens the deployment gate
    pub deployment_threshold: U256,
    /// Minimum number of seconds between two natural deployment passes
    pub min_deployment_interval: u64,
    /// Maximum accepted price impact of a ratio-matching swap, in basis points
    pub max_slippage_bps: u64,
    /// Upper bound in seconds for any external venue or swap call
    pub external_call_timeout: u64,
    /// Number of journal collections kept
    pub journal_capacity: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            deployment_threshold: U256::ZERO,
            min_deployment_interval: DEFAULT_MIN_DEPLOYMENT_INTERVAL,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            external_call_timeout: DEFAULT_EXTERNAL_CALL_TIMEOUT,
            journal_capacity: MAX_JOURNAL_COLLECTIONS,
        }
    }
}

impl VaultConfig {
    /// Sets the deployment threshold.
    pub fn deployment_threshold(&mut self, deployment_threshold: U256) -> &mut Self {
        self.deployment_threshold = deployment_threshold;
        self
    }

    /// Sets the minimum deployment interval, denominated in seconds.
    pub fn min_deployment_interval(&mut self, min_deployment_interval: u64) -> &mut Self {
        self.min_deployment_interval = min_deployment_interval;
        self
    }

    /// Sets the maximum swap price impact in basis points.
    pub fn max_slippage_bps(&mut self, max_slippage_bps: u64) -> &mut Self {
        self.max_slippage_bps = max_slippage_bps;
        self
    }

    /// Sets the external call timeout, denominated in seconds.
    pub fn external_call_timeout(&mut self, external_call_timeout: u64) -> &mut Self {
        self.external_call_timeout = external_call_timeout;
        self
    }

    /// Sets the number of journal collections to keep.
    pub fn journal_capacity(&mut self, journal_capacity: usize) -> &mut Self {
        self.journal_capacity = journal_capacity;
        self
    }

    /// Rejects values the engine cannot operate with.
    pub fn validate(&self) -> VaultResult<()> {
        if self.max_slippage_bps >= BPS_DENOMINATOR {
            return Err(VaultError::InvalidConfiguration(format!(
                "Slippage bound of {} bps leaves no minimum output.",
                self.max_slippage_bps
            )));
        }
        if self.external_call_timeout == 0 {
            return Err(VaultError::InvalidConfiguration(
                "External call timeout must be positive.".to_string(),
            ));
        }
        if self.journal_capacity == 0 {
            return Err(VaultError::InvalidConfiguration(
                "Journal capacity must be positive.".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON encoded `VaultConfigInput`.
    pub fn from_json(json: &str) -> VaultResult<Self> {
        let input: VaultConfigInput = serde_json::from_str(json)
            .map_err(|err| VaultError::DecodingError(err.to_string()))?;
        input.try_into()
    }
}

/// Operator-facing form of the configuration.
/// U256 values travel as decimal strings; omitted fields take their defaults.
#[derive(Clone, CandidType, Debug, Deserialize, Serialize, PartialEq)]
pub struct VaultConfigInput {
    pub deployment_threshold: String,
    #[serde(default)]
    pub min_deployment_interval: Option<u64>,
    #[serde(default)]
    pub max_slippage_bps: Option<u64>,
    #[serde(default)]
    pub external_call_timeout: Option<u64>,
    #[serde(default)]
    pub journal_capacity: Option<u64>,
}

impl TryFrom<VaultConfigInput> for VaultConfig {
    type Error = VaultError;

    fn try_from(value: VaultConfigInput) -> Result<Self, Self::Error> {
        let defaults = VaultConfig::default();
        let journal_capacity = match value.journal_capacity {
            Some(capacity) => usize::try_from(capacity)
                .map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))?,
            None => defaults.journal_capacity,
        };

        let config = VaultConfig {
            deployment_threshold: string_to_u256(&value.deployment_threshold)?,
            min_deployment_interval: value
                .min_deployment_interval
                .unwrap_or(defaults.min_deployment_interval),
            max_slippage_bps: value.max_slippage_bps.unwrap_or(defaults.max_slippage_bps),
            external_call_timeout: value
                .external_call_timeout
                .unwrap_or(defaults.external_call_timeout),
            journal_capacity,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&VaultConfig> for VaultConfigInput {
    fn from(value: &VaultConfig) -> Self {
        Self {
            deployment_threshold: value.deployment_threshold.to_string(),
            min_deployment_interval: Some(value.min_deployment_interval),
            max_slippage_bps: Some(value.max_slippage_bps),
            external_call_timeout: Some(value.external_call_timeout),
            journal_capacity: Some(value.journal_capacity as u64),
        }
    }
}
