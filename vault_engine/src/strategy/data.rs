//! Mutable strategy bookkeeping kept by the vault

use alloy_primitives::U256;

/// Struct containing the vault's mutable view of a strategy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyData {
    /// Value of the strategy's holdings the last time it reported successfully
    pub last_known_value: U256,
    /// Timestamp in seconds of that report
    pub last_valued_at: u64,
    /// Timestamp in seconds of the last deployment the venue accepted
    pub last_deployment_at: u64,
}

impl StrategyData {
    /// Sets the last known value together with the time it was observed.
    pub fn last_known_value(&mut self, value: U256, observed_at: u64) -> &mut Self {
        self.last_known_value = value;
        self.last_valued_at = observed_at;
        self
    }

    /// Sets the last deployment timestamp.
    pub fn last_deployment_at(&mut self, last_deployment_at: u64) -> &mut Self {
        self.last_deployment_at = last_deployment_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_setters() {
        let mut data = StrategyData::default();
        data.last_known_value(U256::from(12345u64), 1700000000)
            .last_deployment_at(1700000100);

        assert_eq!(data.last_known_value, U256::from(12345u64));
        assert_eq!(data.last_valued_at, 1700000000);
        assert_eq!(data.last_deployment_at, 1700000100);
    }
}
