//! Vault engine constants

use alloy_primitives::U256;

/// Scale used for fixed point arithmetic
pub const SCALE: u128 = 1_000_000_000_000_000_000; // e18
pub fn scale() -> U256 {
    U256::from(SCALE)
}

/// Denominator for weights and slippage bounds expressed in basis points
pub const BPS_DENOMINATOR: u64 = 10_000; // 100%
pub fn bps_denominator() -> U256 {
    U256::from(BPS_DENOMINATOR)
}

/// Default maximum accepted price impact of a ratio-matching swap
pub const DEFAULT_MAX_SLIPPAGE_BPS: u64 = 100; // 1%

/// Default upper bound for any external venue or swap call, in seconds
pub const DEFAULT_EXTERNAL_CALL_TIMEOUT: u64 = 300;

/// Default minimum time between two natural deployment passes, in seconds
pub const DEFAULT_MIN_DEPLOYMENT_INTERVAL: u64 = 3_600;

/// Number of journal collections kept before the oldest ones are pruned
pub const MAX_JOURNAL_COLLECTIONS: usize = 300;
